//! Static profile tables shown on the portfolio page.
//!
//! Served as JSON by the HTTP surface and printed by the `profile`
//! subcommand. The data never changes at runtime.

use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Experience {
    pub period: &'static str,
    pub role: &'static str,
    pub company: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_url: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<&'static str>,
    pub points: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Skill {
    pub name: &'static str,
    pub category: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Publication {
    pub year: u16,
    pub title: &'static str,
    pub venue: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Education {
    pub period: &'static str,
    pub degree: &'static str,
    pub institution: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LectureKind {
    Video,
    Document,
    Slides,
}

#[derive(Debug, Clone, Serialize)]
pub struct Lecture {
    pub title: &'static str,
    pub event: &'static str,
    pub date: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<&'static str>,
    pub kind: LectureKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct Project {
    pub title: &'static str,
    pub description: &'static str,
    pub location: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub name: &'static str,
    pub headline: &'static str,
    pub experiences: Vec<Experience>,
    pub skills: Vec<Skill>,
    pub publications: Vec<Publication>,
    pub education: Vec<Education>,
    pub lectures: Vec<Lecture>,
    pub projects: Vec<Project>,
}

static PROFILE: Lazy<Profile> = Lazy::new(build);

pub fn profile() -> &'static Profile {
    &PROFILE
}

const IITKGP: &str = "https://www.iitkgp.ac.in";
const SPAV: &str = "https://www.spav.ac.in";

fn build() -> Profile {
    Profile {
        name: "V Sai Sesidhar",
        headline: "PhD Researcher in Transportation Systems, IIT Kharagpur",
        experiences: vec![
            Experience {
                period: "07/2023 - Present",
                role: "Research Scholar & Teaching Assistant",
                company: "Indian Institute of Technology Kharagpur",
                company_url: Some(IITKGP),
                department: Some("Ranbir and Chitra Gupta School of Infrastructure Design and Management"),
                points: vec![
                    "Teaching Assistant for Multimodal Urban Transport Systems and Public Transport Planning.",
                    "TA for NPTEL MOOC \"Introduction To Multimodal Urban Transportation Systems (MUTS)\".",
                    "Organizing committee member for international conferences on sustainable infrastructure.",
                    "Consultancy work on TUTEM and SAFAR projects involving VISSIM simulations.",
                ],
            },
            Experience {
                period: "01/2024 - 04/2024",
                role: "Visiting Faculty",
                company: "School of Planning and Architecture Vijayawada",
                company_url: Some(SPAV),
                department: None,
                points: vec![
                    "Lectures on applications of remote sensing in environmental planning.",
                    "Conducted hands-on GIS practicals in the Lab: Applications of Geo-informatics.",
                ],
            },
            Experience {
                period: "07/2022 - 07/2023",
                role: "Assistant Professor",
                company: "School of Planning and Architecture Vijayawada",
                company_url: Some(SPAV),
                department: Some("Department of Planning"),
                points: vec![
                    "Theory courses: Public Transport Planning, Freight and Logistics, Regional Transport Planning.",
                    "Guided Comprehensive Mobility Plan for Jodhpur and Transport Infrastructure Plan for Dehradun.",
                    "Hands-on training in Geospatial Techniques (PTV VISSIM/VISUM).",
                    "Consultancy: Polavaram Irrigation Project R&R Plan.",
                ],
            },
            Experience {
                period: "09/2021 - 07/2022",
                role: "Assistant Professor",
                company: "Jawaharlal Nehru Architecture and Fine Arts University",
                company_url: Some("https://jnafau.ac.in"),
                department: Some("Department of Urban and Regional Planning"),
                points: vec![
                    "Taught Traffic and Transportation Planning and Environmental Studies.",
                    "Studio: Area Traffic Plan for Banjara Hills, Hyderabad.",
                    "PI for Logistics bundling for efficient freight transport research.",
                ],
            },
        ],
        skills: vec![
            Skill { name: "PTV VISSIM", category: "Microscopic Simulation" },
            Skill { name: "PTV VISUM", category: "Demand Modelling" },
            Skill { name: "ArcGIS / QGIS", category: "Geospatial" },
            Skill { name: "Python & R", category: "Data Science" },
            Skill { name: "SPSS & AnyLogic", category: "Statistics" },
            Skill { name: "LaTeX & Overleaf", category: "Reporting" },
            Skill { name: "Machine Learning", category: "AI" },
            Skill { name: "Freight & Logistics", category: "Economics" },
        ],
        publications: vec![
            Publication {
                year: 2026,
                title: "Multidimensional driving risk prediction: A machine learning approach with instrumented vehicle data",
                venue: "105th TRB Annual Meeting (Communicated)",
            },
            Publication {
                year: 2025,
                title: "Analyzing driver emotion and behavior during peak and off-peak traffic conditions",
                venue: "8th Conference of the Transportation Research Group (Accepted)",
            },
            Publication {
                year: 2024,
                title: "Potential of Alternative Technology for Urban Freight - A Case of Dehradun",
                venue: "Springer - Sustainable Civil Infrastructures",
            },
            Publication {
                year: 2023,
                title: "Identifying the parameters influencing the adoption of electric intermediate public transport: Gwalior city",
                venue: "IOP Conference Series",
            },
            Publication {
                year: 2023,
                title: "Influence of Regional Transport Accessibility on Development of Settlements: Visakhapatnam Region",
                venue: "Planning Malaysia Journal",
            },
            Publication {
                year: 2023,
                title: "Streamlining Freight Transport Through Planning Interventions in Vijayawada City",
                venue: "Springer Geography",
            },
        ],
        education: vec![
            Education {
                period: "2023 - Present",
                degree: "PhD in Transportation Systems",
                institution: "IIT Kharagpur",
                details: Some("Pursuing"),
            },
            Education {
                period: "2023 - 2025",
                degree: "MA Economics",
                institution: "IGNOU",
                details: None,
            },
            Education {
                period: "2019 - 2021",
                degree: "M.Planning (Transportation)",
                institution: "SPA Vijayawada",
                details: Some("CGPA: 8.53"),
            },
            Education {
                period: "2020 - 2022",
                degree: "PG Dip Applied Statistics",
                institution: "IGNOU",
                details: Some("69%"),
            },
            Education {
                period: "2015 - 2019",
                degree: "B.Tech (Planning)",
                institution: "JNAFAU Hyderabad",
                details: None,
            },
        ],
        lectures: vec![
            Lecture {
                title: "Geospatial Techniques for Transportation Planning",
                event: "Expert Lecture Series",
                date: "15-16 April 2024",
                url: Some("https://www.youtube.com/live/FN30XdhXqsE"),
                kind: LectureKind::Video,
            },
            Lecture {
                title: "PTV VISSIM Simulation Techniques",
                event: "Executive Development Programme (EDP)",
                date: "July 2023",
                url: Some("https://raw.githubusercontent.com/Sesi1397/Sesi1397.github.io/main/SesidharV.pdf"),
                kind: LectureKind::Document,
            },
            Lecture {
                title: "Remote Sensing in Environmental Planning",
                event: "School of Planning and Architecture Vijayawada",
                date: "Jan 2024",
                url: None,
                kind: LectureKind::Slides,
            },
        ],
        projects: vec![
            Project { title: "Charlapally Station Development", description: "Decongestion through integrated infrastructure.", location: "Hyderabad" },
            Project { title: "Mobility Plan Jodhpur", description: "PTV VISUM travel demand modelling.", location: "Consultancy" },
            Project { title: "Dehradun-Mussoorie Plan", description: "Tourism and logistics flow optimization.", location: "Hill Station Mobility" },
            Project { title: "Logistics Bundling", description: "PI for freight optimization research.", location: "Hyderabad" },
            Project { title: "Polavaram R&R Plan", description: "Community rehabilitation planning.", location: "Consultancy" },
            Project { title: "TUTEM & SAFAR", description: "Urban transit and AI-based road safety.", location: "IIT Kharagpur" },
        ],
    }
}
