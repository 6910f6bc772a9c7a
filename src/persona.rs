//! Fixed persona the assistant answers as, and the prompt template that wraps
//! every visitor question.

/// Biography facts handed to the generator with every question.
pub const CONTEXT: &str = "\
V Sai Sesidhar: PhD Researcher at IIT Kharagpur (Infrastructure Design and Management).
Focus: Mixed traffic behavior, Machine Learning in Transport, Driving Risk.
Experience: Assistant Professor at SPA Vijayawada and JNAFAU Hyderabad.
Publications: 105th TRB Meeting, 8th CTRG, Springer Civil Infrastructures.
Consultancy: Charlapally Station, Mobility Plan Jodhpur, TUTEM/SAFAR.";

const PREAMBLE: &str = "\
You are an AI research assistant for V Sai Sesidhar, a PhD Researcher at IIT Kharagpur specializing in Transport Systems.
Use the following context about his background to answer the user's question. If the information is not in the context, be polite and stick to his professional persona.";

/// Wrap `question` in the persona template.
pub fn build_prompt(question: &str) -> String {
    build_prompt_with(CONTEXT, question)
}

pub fn build_prompt_with(context: &str, question: &str) -> String {
    format!("{PREAMBLE}\n\nCONTEXT:\n{context}\n\nQUESTION:\n{question}")
}
