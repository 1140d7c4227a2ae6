//! Instruction template for entity extraction.

pub const EXTRACTION_SYSTEM: &str =
    "You extract structured information from team status documents and reports. \
     You answer with a single JSON object and nothing else.";

const EXTRACTION_TEMPLATE: &str = r#"Analyze the document below and extract:

1. People: full names.
2. Hard skills: technical skills, tools and languages (React, Python, AWS, SQL, Docker, ...).
3. Soft skills: leadership, communication, mentoring, project management, ...
   Never list a technical skill as a soft skill.
4. Projects: names, a one or two sentence description, and the technologies used.
5. Who worked on which project, and in what role (1-3 words, e.g. "lead developer").

Use canonical skill names where one exists: "React" (not ReactJS), "Node.js",
"PostgreSQL" (not Postgres), "Kubernetes" (not K8s), "leadership", "mentoring",
"problem-solving", "project management", "collaboration".

Return JSON with exactly this shape:
{
  "people": [
    {
      "name": "Full Name",
      "hard_skills": ["skill"],
      "soft_skills": ["skill"],
      "projects": [{"project": "Project Name", "role": "role"}]
    }
  ],
  "projects": [
    {
      "name": "Project Name",
      "description": "Brief description",
      "technologies": ["technology"]
    }
  ]
}

Every list must be a JSON array, even with one element. Use [] when nothing applies.

Document to analyze:

{document}

Return ONLY the JSON object."#;

/// The extraction prompt for one document's text.
pub fn extraction_prompt(text: &str) -> String {
    EXTRACTION_TEMPLATE.replace("{document}", text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_is_embedded_once() {
        let prompt = extraction_prompt("Sarah Chen led the API Migration.");
        assert_eq!(prompt.matches("Sarah Chen led the API Migration.").count(), 1);
        assert!(!prompt.contains("{document}"));
    }
}
