// Prompt templates for the text generation actions
// Output uses the instruct format expected by the default text model

use serde_json::Value;

const EDUCATOR_PREAMBLE: &str = "You are a patient crypto-market educator. \
Explain in plain language, stay neutral, and never give financial advice.";

fn instruct(body: &str) -> String {
    format!("<s>[INST] {EDUCATOR_PREAMBLE}\n\n{body} [/INST]")
}

fn render_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

pub fn market_insight(market_data: &Value, insight_prompt: &str) -> String {
    instruct(&format!(
        "Current market data (JSON):\n{}\n\nQuestion: {insight_prompt}\n\n\
         Answer in at most three short paragraphs and point out what the numbers \
         do and do not tell us.",
        render_json(market_data)
    ))
}

pub fn educational_content(topic: &str, level: &str) -> String {
    instruct(&format!(
        "Write a short lesson about \"{topic}\" for a {level} audience. \
         Start with a one-sentence summary, then explain the key ideas with one \
         concrete example, and finish with three review questions."
    ))
}

pub fn visualization_prompt(data_type: &str, chart_type: &str, data: Option<&Value>) -> String {
    let sample = data.map_or_else(String::new, |d| {
        format!("\n\nSample of the data (JSON):\n{}", render_json(d))
    });
    instruct(&format!(
        "Write a single image-generation prompt for an educational {chart_type} chart \
         showing {data_type}. Describe layout, axes, colors and labels. \
         Reply with the prompt only.{sample}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_market_insight_embeds_data_and_question() {
        let prompt = market_insight(&json!({ "bitcoin_dominance": 52.3 }), "Is BTC dominant?");
        assert!(prompt.starts_with("<s>[INST]"));
        assert!(prompt.ends_with("[/INST]"));
        assert!(prompt.contains("\"bitcoin_dominance\": 52.3"));
        assert!(prompt.contains("Question: Is BTC dominant?"));
    }

    #[test]
    fn test_educational_content_uses_level() {
        let prompt = educational_content("staking", "advanced");
        assert!(prompt.contains("\"staking\""));
        assert!(prompt.contains("advanced audience"));
    }

    #[test]
    fn test_visualization_prompt_optional_data() {
        let without = visualization_prompt("market dominance", "pie", None);
        assert!(without.contains("educational pie chart showing market dominance"));
        assert!(!without.contains("Sample of the data"));

        let with = visualization_prompt("price", "line", Some(&json!([1, 2, 3])));
        assert!(with.contains("Sample of the data"));
    }
}
