// Parse the grading model's reply. The grading prompt asks for a line of
// the form "Awarded Points: <number>"; everything else in the reply is kept
// as feedback for the student.

use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedGrade {
    pub points: f64,
    pub feedback: String,
}

/// Extract the awarded points and feedback text from a grading reply.
/// Returns `None` when no points line is present; the caller decides the
/// fallback. Points are clamped to `[0, max_points]` so a model cannot
/// award more than the question is worth, or negative points.
pub fn parse_grading_reply(reply: &str, max_points: f64) -> Option<ParsedGrade> {
    let pattern = points_pattern();
    let captures = pattern.captures(reply)?;
    let raw: f64 = captures.get(1)?.as_str().parse().ok()?;
    let points = raw.clamp(0.0, max_points);

    let feedback = pattern.replace(reply, "").trim().to_string();
    Some(ParsedGrade { points, feedback })
}

fn points_pattern() -> Regex {
    // Tolerates markdown emphasis around the label and a trailing "/max".
    Regex::new(r"(?i)\**awarded points\**\s*:\s*\**\s*(\d+(?:\.\d+)?)").expect("static pattern")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_reply() {
        let reply = "Awarded Points: 7\nGood coverage of the main idea.";
        let grade = parse_grading_reply(reply, 10.0).unwrap();
        assert_eq!(grade.points, 7.0);
        assert_eq!(grade.feedback, "Good coverage of the main idea.");
    }

    #[test]
    fn is_case_insensitive_and_tolerates_emphasis() {
        let reply = "**awarded points**: 3.5\nPartially correct.";
        let grade = parse_grading_reply(reply, 5.0).unwrap();
        assert_eq!(grade.points, 3.5);
    }

    #[test]
    fn clamps_above_max() {
        let grade = parse_grading_reply("Awarded Points: 42", 10.0).unwrap();
        assert_eq!(grade.points, 10.0);
    }

    #[test]
    fn finds_points_line_after_feedback() {
        let reply = "The answer misses the second mechanism.\nAwarded Points: 2";
        let grade = parse_grading_reply(reply, 5.0).unwrap();
        assert_eq!(grade.points, 2.0);
        assert_eq!(grade.feedback, "The answer misses the second mechanism.");
    }

    #[test]
    fn missing_points_line_yields_none() {
        assert!(parse_grading_reply("Nice try!", 10.0).is_none());
    }

    #[test]
    fn zero_points_parse_as_zero() {
        let grade = parse_grading_reply("Awarded Points: 0\nIncorrect.", 10.0).unwrap();
        assert_eq!(grade.points, 0.0);
        assert_eq!(grade.feedback, "Incorrect.");
    }
}
