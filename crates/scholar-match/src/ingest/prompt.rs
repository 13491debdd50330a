use crate::llm::CompletionRequest;

const SYSTEM: &str = "You convert scholarship notices into structured data. Reply with JSON only.";

const INSTRUCTIONS: &str = r#"Extract every scholarship or scheme described in the document below, whether it appears in a table, a list or running text. A table with 30 rows yields 30 objects; do not merge, skip or summarize entries.

Rules:
1. Reply with a raw JSON array only: no markdown, no commentary.
2. One object per scholarship.
3. Use null for anything the document does not state. Do not guess.
4. Amounts are plain numbers: drop currency symbols, commas and phrases such as "per annum".
5. CGPA uses the 10-point scale; convert percentages (75% becomes 7.5).
6. deadline is YYYY-MM-DD or null.
7. applyLink must start with http, otherwise null.
8. description is at most three sentences.

Each object has exactly these keys:
{
  "title": "Scheme name as written",
  "provider": "Ministry, trust or institution",
  "amount": 50000,
  "amountType": "CASH or WAIVER",
  "deadline": "2025-10-31",
  "minCGPA": 6.0,
  "maxIncome": 250000,
  "courseRestriction": "BE/BTech",
  "categoryRestriction": "SC/ST",
  "yearRestriction": "1st year",
  "applyLink": "https://scholarships.gov.in",
  "description": "Short summary."
}

DOCUMENT:
"#;

const CLOSING: &str = "\n\nReply with the JSON array only, starting with [ and ending with ].";

pub fn extraction_request(document_text: &str) -> CompletionRequest {
    CompletionRequest::new(format!("{INSTRUCTIONS}{document_text}{CLOSING}")).with_system(SYSTEM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_is_embedded_between_instructions_and_closing() {
        let request = extraction_request("NOTICE TEXT");
        assert!(request.user.contains("DOCUMENT:\nNOTICE TEXT\n\nReply"));
        assert!(request.user.contains("\"minCGPA\""));
        assert_eq!(request.system.as_deref(), Some(SYSTEM));
    }
}
