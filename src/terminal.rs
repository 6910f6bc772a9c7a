//! Terminal view of the chat widget.
//!
//! The view renders [`ChatEvent`]s as they arrive; printing each new turn is
//! how a terminal scrolls to the newest message.

use std::io::{self, Write};
use std::time::Duration;

use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;

use crate::chat::{ChatEvent, ChatWidget, Speaker, SubmitOutcome, Turn};
use crate::error::FolioError;
use crate::profile::Profile;
use crate::providers::Generator;
use crate::scheduler::{FrameScheduler, SchedulerConfig};
use crate::traffic::{DrawCommand, Frame, TrafficSurface, BRAKING_COLOR};

pub fn print_header(model: &str, session: &uuid::Uuid) {
    println!("{}", "RESEARCH ASSISTANT".bright_cyan().bold());
    println!("{}: {}", "Model".bright_yellow(), model);
    println!("{}: {}", "Session".bright_yellow(), session);
    println!("{}", "Type a question, or /quit to leave.".bright_white());
    println!("{}", "=".repeat(50).bright_blue());
}

pub fn format_turn(turn: &Turn) -> String {
    match turn.speaker {
        Speaker::User => format!("{} {}", "you ›".bright_green().bold(), turn.text),
        Speaker::Assistant => format!("{} {}", "assistant ›".bright_cyan().bold(), turn.text),
    }
}

fn render(event: ChatEvent, echo_user: bool) {
    match event {
        ChatEvent::Appended { turn, .. } if turn.speaker == Speaker::User && !echo_user => {}
        ChatEvent::Appended { turn, .. } => println!("{}", format_turn(&turn)),
        ChatEvent::Busy(true) => println!("{}", "  thinking…".dimmed()),
        ChatEvent::Busy(false) => {}
    }
}

/// Submit `text` while rendering the widget's events as they happen.
async fn submit_and_render<G: Generator>(
    chat: &ChatWidget<G>,
    events: &mut broadcast::Receiver<ChatEvent>,
    text: &str,
    echo_user: bool,
) -> SubmitOutcome {
    let submit = chat.submit(text);
    tokio::pin!(submit);
    let outcome = loop {
        tokio::select! {
            outcome = &mut submit => break outcome,
            Ok(event) = events.recv() => render(event, echo_user),
        }
    };
    while let Ok(event) = events.try_recv() {
        render(event, echo_user);
    }
    outcome
}

/// Ask one question, print the exchange, return the outcome.
pub async fn one_shot<G: Generator>(chat: &ChatWidget<G>, question: &str) -> SubmitOutcome {
    let mut events = chat.subscribe();
    let outcome = submit_and_render(chat, &mut events, question, true).await;
    if outcome == SubmitOutcome::Empty {
        eprintln!("{}", "Nothing to ask: the question is empty.".bright_red());
    }
    outcome
}

/// Interactive loop over stdin until EOF or `/quit`.
pub async fn run_repl<G: Generator>(chat: &ChatWidget<G>, model: &str) -> Result<(), FolioError> {
    print_header(model, &chat.session_id());
    for turn in chat.transcript() {
        println!("{}", format_turn(&turn));
    }

    let mut events = chat.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "›".bright_green());
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if matches!(line.trim(), "/quit" | "/exit") {
            break;
        }
        submit_and_render(chat, &mut events, &line, false).await;
    }
    println!();
    Ok(())
}

/// One status line for the live loop: frames so far, vehicles drawn, braking.
pub fn format_status(rendered: u64, frame: &Frame) -> String {
    let (vehicles, braking) = frame
        .commands
        .iter()
        .filter_map(|c| match c {
            DrawCommand::RoundRect { fill, .. } => Some(*fill == BRAKING_COLOR),
            _ => None,
        })
        .fold((0usize, 0usize), |(n, b), is_braking| (n + 1, b + usize::from(is_braking)));
    format!(
        "{} {:>6} frames  {:>3} vehicles  {}",
        "traffic ›".bright_blue().bold(),
        rendered,
        vehicles,
        format!("{braking} braking").bright_red()
    )
}

/// Drive the redraw loop for `duration`, printing [`format_status`] once a
/// second. Returns the number of frames rendered.
pub async fn run_animation(
    surface: TrafficSurface,
    config: SchedulerConfig,
    pointer: Option<(f64, f64)>,
    duration: Duration,
) -> u64 {
    let scheduler = FrameScheduler::start(surface, config);
    if let Some((x, y)) = pointer {
        scheduler.pointer_moved(x, y);
    }

    let mut status = tokio::time::interval(Duration::from_secs(1));
    // first tick fires immediately
    status.tick().await;
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = status.tick() => {
                println!("{}", format_status(scheduler.frames_rendered(), &scheduler.latest_frame()));
            }
        }
    }

    let rendered = scheduler.frames_rendered();
    scheduler.stop().await;
    rendered
}

/// The profile tables as terminal lines, section by section.
pub fn profile_lines(profile: &Profile) -> Vec<String> {
    let mut lines = vec![
        profile.name.bright_cyan().bold().to_string(),
        profile.headline.bright_white().to_string(),
    ];
    fn section(lines: &mut Vec<String>, title: &str) {
        lines.push(String::new());
        lines.push(title.bright_yellow().bold().to_string());
    }

    section(&mut lines, "Experience");
    for e in &profile.experiences {
        lines.push(format!("  {} {}, {}", e.period.dimmed(), e.role.bold(), e.company));
        for p in &e.points {
            lines.push(format!("    - {p}"));
        }
    }

    section(&mut lines, "Education");
    for e in &profile.education {
        let head = format!("  {} {}, {}", e.period.dimmed(), e.degree.bold(), e.institution);
        match e.details {
            Some(d) => lines.push(format!("{head} ({d})")),
            None => lines.push(head),
        }
    }

    section(&mut lines, "Skills");
    for s in &profile.skills {
        lines.push(format!("  {} {}", s.name.bold(), format!("({})", s.category).dimmed()));
    }

    section(&mut lines, "Publications");
    for p in &profile.publications {
        lines.push(format!("  {} {}", p.year.to_string().dimmed(), p.title));
        lines.push(format!("       {}", p.venue.italic()));
    }

    section(&mut lines, "Lectures");
    for l in &profile.lectures {
        lines.push(format!("  {} {} - {}", l.date.dimmed(), l.title.bold(), l.event));
    }

    section(&mut lines, "Projects");
    for p in &profile.projects {
        lines.push(format!(
            "  {} {} {}",
            p.title.bold(),
            format!("[{}]", p.location).dimmed(),
            p.description
        ));
    }
    lines
}

pub fn print_profile(profile: &Profile) {
    for line in profile_lines(profile) {
        println!("{line}");
    }
}
