// Prompt templates for the classifier. Placeholders in `{braces}` are
// substituted by `classifier::claude` before sending.

/// Replace `{count}`.
pub const PROFILES_PROMPT_TEMPLATE: &str = r#"Invent {count} fictional job candidates for a software company's hiring pipeline.

The batch MUST be deliberately heterogeneous in quality:
- at least one clearly strong candidate (deep, relevant experience and a coherent skill set),
- at least one clearly weak candidate (little experience, scattered or outdated skills),
- the rest spread across the middle.

Return a JSON array of exactly {count} objects with this EXACT structure:
[
  {
    "firstName": "string",
    "lastName": "string",
    "email": "string (realistic, lowercase, unique within the batch)",
    "phone": "string",
    "yearsOfExp": 0,
    "skills": ["string"]
  }
]

Rules:
- yearsOfExp: integer between 0 and 20
- skills: between 3 and 8 concrete technology or practice names
- use varied, realistic names; do not reuse the same person twice

{json_array_instruction}"#;

/// Replace `{language}`, `{name}`, `{years}`, `{skills}`.
pub const CV_PROMPT_TEMPLATE: &str = r#"Write a professional CV in {language} for the following candidate.
Format it cleanly with clearly separated sections.

Candidate details:
- Name: {name}
- Years of experience: {years}
- Skills: {skills}

The CV must contain:
1. Personal details
2. Professional summary
3. Skills, grouped by category
4. Work experience (realistic entries consistent with the skills and years of experience)
5. Education (entries appropriate for the profile)

The CV should be detailed, professional and ready to send to employers."#;

/// Replace `{criteria}`, `{candidates_json}`.
pub const RANKING_PROMPT_TEMPLATE: &str = r#"You are an expert HR recruiter. Evaluate and rank the following candidates for this position: "{criteria}".

Candidates (JSON):
{candidates_json}

Return a JSON array with one object per candidate, using this exact structure:
[
  {
    "id": "the candidate's id, copied exactly",
    "score": 85,
    "reasoning": "Brief explanation of the score",
    "shouldInterview": true
  }
]

Rules:
- include EVERY candidate exactly once, identified by the "id" given above
- score: integer 1-100 reflecting how well the candidate matches the position
- shouldInterview: true if score >= 50, false otherwise
- reasoning: explain why this candidate received this score
- order by score descending

{json_array_instruction}"#;
