//! Text protocol parser
//!
//! Turns free-form model output into an [`AgentStep`]. The parser is
//! deliberately lenient: the first `Action:` line wins, quotes and trailing
//! call syntax are stripped, and a missing `Action Input:` line falls back to
//! a `name(arg)` scan. Nothing here can fail; the worst case is a tool with
//! no argument.

use crate::models::{AgentStep, ParsedAction};
use lazy_static::lazy_static;
use regex::Regex;

pub const ACTION_PREFIX: &str = "Action:";
pub const ACTION_INPUT_PREFIX: &str = "Action Input:";
pub const FINAL_ANSWER_MARKER: &str = "Final Answer:";
pub const OBSERVATION_MARKER: &str = "Observation:";

lazy_static! {
    static ref PAREN_ARGUMENT: Regex = Regex::new(r"Action:.*?\((.*?)\)").unwrap();
}

/// Classify one completion.
///
/// A final-answer marker anywhere in the text takes precedence over actions.
pub fn parse_step(text: &str) -> AgentStep {
    if let Some(answer) = extract_final_answer(text) {
        return AgentStep::FinalAnswer(answer);
    }

    match parse_action(text) {
        (Some(tool), argument) => AgentStep::Action(ParsedAction { tool, argument }),
        (None, _) => AgentStep::Continue,
    }
}

/// Text between the first `Final Answer:` marker and the next one (or the end).
pub fn extract_final_answer(text: &str) -> Option<String> {
    text.split(FINAL_ANSWER_MARKER)
        .nth(1)
        .map(|answer| answer.trim().to_string())
}

/// Everything the model wrote before its first `Action:`; the whole text otherwise.
pub fn extract_thought(text: &str) -> &str {
    match text.find(ACTION_PREFIX) {
        Some(index) => text[..index].trim(),
        None => text.trim(),
    }
}

/// Extract `(tool, argument)` from model output.
pub fn parse_action(text: &str) -> (Option<String>, Option<String>) {
    let mut tool: Option<String> = None;
    let mut argument: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();

        if line.starts_with(ACTION_PREFIX) && tool.is_none() {
            tool = non_empty(clean_tool_name(segment_after(line, ACTION_PREFIX)));
        } else if line.starts_with(ACTION_INPUT_PREFIX) && argument.is_none() {
            argument = non_empty(strip_quotes(segment_after(line, ACTION_INPUT_PREFIX).trim()));
        }
    }

    if tool.is_some() && argument.is_none() {
        argument = PAREN_ARGUMENT
            .captures(text)
            .and_then(|caps| caps.get(1))
            .and_then(|m| non_empty(strip_quotes(m.as_str())));
    }

    (tool, argument)
}

/// The piece of `line` between the first and second occurrence of `marker`.
fn segment_after<'a>(line: &'a str, marker: &str) -> &'a str {
    line.split(marker).nth(1).unwrap_or("")
}

fn clean_tool_name(raw: &str) -> String {
    let mut name = raw.trim();
    if let Some(index) = name.find('(') {
        name = name[..index].trim();
    }
    if let Some(index) = name.find("->") {
        name = name[..index].trim();
    }
    name.to_string()
}

fn strip_quotes(value: &str) -> String {
    value.trim_matches('"').trim_matches('\'').to_string()
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(tool: &str, argument: Option<&str>) -> AgentStep {
        AgentStep::Action(ParsedAction {
            tool: tool.to_string(),
            argument: argument.map(str::to_string),
        })
    }

    #[test]
    fn test_standard_action_with_quoted_input() {
        let text = "Thought: I need the price.\nAction: get_stock_price\nAction Input: \"ASELS.IS\"";
        assert_eq!(
            parse_action(text),
            (Some("get_stock_price".to_string()), Some("ASELS.IS".to_string()))
        );
    }

    #[test]
    fn test_single_quotes_and_indentation() {
        let text = "   Action: get_ticker_symbol  \n   Action Input: 'Aselsan'  ";
        assert_eq!(
            parse_action(text),
            (Some("get_ticker_symbol".to_string()), Some("Aselsan".to_string()))
        );
    }

    #[test]
    fn test_parenthesized_argument_fallback() {
        let text = "Thought: call it inline\nAction: foo(bar)";
        assert_eq!(
            parse_action(text),
            (Some("foo".to_string()), Some("bar".to_string()))
        );
    }

    #[test]
    fn test_parenthesized_quoted_argument_fallback() {
        let text = "Action: get_stock_price(\"THYAO.IS\")";
        assert_eq!(
            parse_action(text),
            (Some("get_stock_price".to_string()), Some("THYAO.IS".to_string()))
        );
    }

    #[test]
    fn test_arrow_suffix_is_stripped() {
        let text = "Action: get_stock_price -> ASELS.IS\nAction Input: ASELS.IS";
        assert_eq!(parse_action(text).0.as_deref(), Some("get_stock_price"));
    }

    #[test]
    fn test_tool_without_argument_degrades_gracefully() {
        let text = "Action: analyze_technical_data";
        assert_eq!(
            parse_action(text),
            (Some("analyze_technical_data".to_string()), None)
        );
    }

    #[test]
    fn test_input_line_wins_over_parenthesized_form() {
        let text = "Action: foo(bar)\nAction Input: baz";
        assert_eq!(
            parse_action(text),
            (Some("foo".to_string()), Some("baz".to_string()))
        );
    }

    // Multi-action outputs: only the first action is honored, later ones are dropped.
    #[test]
    fn test_first_action_line_wins() {
        let text = "Action: get_ticker_symbol\nAction Input: Aselsan\nAction: get_stock_price\nAction Input: ASELS.IS";
        assert_eq!(
            parse_action(text),
            (Some("get_ticker_symbol".to_string()), Some("Aselsan".to_string()))
        );
    }

    #[test]
    fn test_empty_action_line_does_not_block_later_one() {
        let text = "Action:\nAction: get_stock_price\nAction Input: TRY=X";
        assert_eq!(
            parse_action(text),
            (Some("get_stock_price".to_string()), Some("TRY=X".to_string()))
        );
    }

    #[test]
    fn test_no_action() {
        assert_eq!(parse_action("Thought: I am not sure yet."), (None, None));
        assert_eq!(parse_step("Thought: I am not sure yet."), AgentStep::Continue);
    }

    #[test]
    fn test_input_without_action_is_ignored_by_step() {
        assert_eq!(parse_step("Action Input: ASELS.IS"), AgentStep::Continue);
    }

    #[test]
    fn test_final_answer_wins_over_action() {
        let text = "Action: get_stock_price\nAction Input: ASELS.IS\nFinal Answer: Aselsan trades at 224.10 TL.";
        assert_eq!(
            parse_step(text),
            AgentStep::FinalAnswer("Aselsan trades at 224.10 TL.".to_string())
        );
    }

    #[test]
    fn test_parse_step_action() {
        let text = "Thought: price first\nAction: get_stock_price\nAction Input: \"ASELS.IS\"";
        assert_eq!(parse_step(text), action("get_stock_price", Some("ASELS.IS")));
    }

    #[test]
    fn test_extract_thought() {
        assert_eq!(
            extract_thought("Thought: need ticker\nAction: get_ticker_symbol"),
            "Thought: need ticker"
        );
        assert_eq!(extract_thought("  just thinking  "), "just thinking");
    }

    #[test]
    fn test_final_answer_is_trimmed() {
        assert_eq!(
            extract_final_answer("Thought: done\nFinal Answer:   6.31 USD \n"),
            Some("6.31 USD".to_string())
        );
        assert_eq!(extract_final_answer("no marker"), None);
    }
}
