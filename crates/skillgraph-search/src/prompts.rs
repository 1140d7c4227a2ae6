//! Instruction template for intent classification.

pub const INTENT_SYSTEM: &str =
    "You classify questions about a knowledge graph of people, skills and projects. \
     You answer with a single JSON object and nothing else.";

const INTENT_TEMPLATE: &str = r#"The graph holds:
- Person nodes, linked to Skill nodes by HAS_HARD_SKILL or HAS_SOFT_SKILL
- Project nodes, linked to Skill nodes by USES_TECH
- WORKS_ON links from Person to Project, carrying the person's role

Classify the question into one of these types:
- find_person_by_skill: people with given skills ("Who knows React?")
- find_project_by_technology: projects using given technologies ("Projects using Go")
- find_collaborators: people who worked with a named person ("Who worked with Sarah Chen?")
- find_person_by_role: people by project role ("Backend engineers")
- find_person_details: one named person's skills and projects ("What did Alice work on?")
- keyword_search: anything else

Use canonical skill names: React, Node.js, Python, JavaScript, TypeScript, AWS,
Docker, Kubernetes, PostgreSQL, SQL, GraphQL, REST API, Git, CI/CD, leadership,
communication, problem-solving, project management, collaboration, mentoring.

Set match_all to true only when the question requires every listed skill
("both", "and", "all"); otherwise false.

Return JSON with exactly this shape:
{
  "type": "find_person_by_skill",
  "skills": ["skill"],
  "keywords": ["keyword"],
  "target_person": "Full Name or null",
  "match_all": false
}

skills and keywords must be JSON arrays. Put role words and free-text terms
in keywords.

Question: {query}

Return ONLY the JSON object."#;

/// The intent prompt for one user question.
pub fn intent_prompt(query: &str) -> String {
    INTENT_TEMPLATE.replace("{query}", query)
}
