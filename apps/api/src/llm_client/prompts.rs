// Prompt fragments shared by every classifier call.
// Call-specific templates live in `classifier::prompts`.

/// System prompt that pins the model to bare JSON output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended to prompts whose output is parsed as a JSON array.
pub const JSON_ARRAY_INSTRUCTION: &str =
    "Return ONLY a valid JSON array. No markdown formatting, no code blocks, no additional text.";
