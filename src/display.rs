use colored::*;

use crate::models::{Message, MessageKind, Review};
use crate::product::ProductState;
use crate::search::ReviewRow;

/// Review text preview length on chat product cards
pub const CARD_PREVIEW_CHARS: usize = 150;

/// Cut `text` to at most `max` characters, marking the cut with `...`
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Five-slot star bar with half-point precision
pub fn stars(rating: f32) -> String {
    let halves = (rating.clamp(0.0, 5.0) * 2.0).round() as usize;
    let full = halves / 2;
    let half = halves % 2;
    let empty = 5 - full - half;
    format!("{}{}{}", "★".repeat(full), "½".repeat(half), "☆".repeat(empty))
}

fn format_rating(rating: f32) -> String {
    if rating.fract() == 0.0 {
        format!("{rating:.0}")
    } else {
        format!("{rating:.1}")
    }
}

pub fn render_message(message: &Message) -> String {
    if message.loading {
        return format!("   {} {}", "🤖".bright_green(), "Searching...".dimmed());
    }

    match &message.kind {
        MessageKind::Product {
            title,
            rating,
            clothing_id,
        } => {
            let mut out = String::new();
            out.push_str(&format!(
                "   ┌ {}  {}\n",
                title.bold(),
                stars(*rating).bright_yellow()
            ));
            out.push_str(&format!(
                "   │ {}\n",
                truncate(&message.text, CARD_PREVIEW_CHARS).white()
            ));
            out.push_str(&format!(
                "   └ {}",
                format!("view: seeksense product {clothing_id}").cyan()
            ));
            out
        }
        MessageKind::Plain if message.from_user => {
            format!("{} {}", "you ›".bright_green().bold(), message.text)
        }
        MessageKind::Plain => format!("{} {}", "🤖".bright_green(), message.text),
    }
}

pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .map(render_message)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Dashboard table; a single placeholder row when there is nothing to show
pub fn render_table(rows: &[ReviewRow]) -> String {
    let header = format!(
        "{:<10} {:<28} {:<54} {:<6} {:<16} {:<12} {}",
        "ClothingID", "Title", "ReviewText", "Rating", "Division", "Department", "Class"
    );
    let mut out = vec![header.bold().to_string()];

    if rows.is_empty() {
        out.push(format!("{}", "No results found.".dimmed()));
        return out.join("\n");
    }

    for row in rows {
        out.push(format!(
            "{:<10} {:<28} {:<54} {:<6} {:<16} {:<12} {}",
            row.clothing_id,
            truncate(&row.title, 25),
            row.preview,
            format_rating(row.rating),
            row.division,
            row.department,
            row.class
        ));
    }
    out.join("\n")
}

/// Detail card for one review row. Optional fields only appear when present.
pub fn render_product_card(review: &Review) -> String {
    let mut lines = Vec::new();

    let title = if review.title.is_empty() {
        "Untitled Review"
    } else {
        review.title.as_str()
    };
    let mut heading = title.bold().to_string();
    if review.rating > 0.0 {
        heading.push_str(&format!(
            "  {} ({})",
            stars(review.rating).bright_yellow(),
            format_rating(review.rating)
        ));
    }
    lines.push(heading);
    lines.push("─".repeat(48));

    if !review.review_text.is_empty() {
        lines.push(format!("  \"{}\"", review.review_text).italic().to_string());
    }

    let mut chips = vec![format!("Clothing ID: {}", review.clothing_id)];
    if let Some(age) = review.age {
        chips.push(format!("Age: {age}"));
    }
    match review.recommended {
        Some(true) => chips.push(format!("{}", "✔ Recommended".green())),
        Some(false) => chips.push(format!("{}", "✘ Not Recommended".red())),
        None => {}
    }
    if let Some(count) = review.positive_feedback_count {
        chips.push(format!("👍 {count} helpful"));
    }
    lines.push(format!("  [{}]", chips.join("] [")));

    let breadcrumb: Vec<&str> = [
        review.division_name.as_str(),
        review.department_name.as_str(),
        review.class_name.as_str(),
    ]
    .into_iter()
    .filter(|s| !s.is_empty())
    .collect();
    if !breadcrumb.is_empty() {
        lines.push(format!("  {}", breadcrumb.join(" › ").dimmed()));
    }

    lines.join("\n")
}

pub fn render_product_state(state: &ProductState) -> String {
    match state {
        ProductState::Loading => format!("{}", "Loading...".dimmed()),
        ProductState::Empty => format!("{}", "Review not found".red()),
        ProductState::Ready(rows) => {
            let mut out = vec![format!("{}", "Product Review".bold().bright_green())];
            out.extend(rows.iter().map(render_product_card));
            out.join("\n\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;

    fn review() -> Review {
        Review {
            clothing_id: 1077,
            title: "Flattering".to_string(),
            review_text: "Great fit".to_string(),
            rating: 4.5,
            division_name: "General".to_string(),
            department_name: "Dresses".to_string(),
            class_name: String::new(),
            age: None,
            recommended: Some(false),
            positive_feedback_count: Some(0),
        }
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exactly10!", 10), "exactly10!");
        assert_eq!(truncate("abcdefghijk", 10), "abcdefghij...");
        assert_eq!(truncate("ééééé", 3), "ééé...");
        assert_eq!(truncate("", 5), "");
    }

    #[test]
    fn test_stars_half_points() {
        assert_eq!(stars(5.0), "★★★★★");
        assert_eq!(stars(3.5), "★★★½☆");
        assert_eq!(stars(0.0), "☆☆☆☆☆");
        assert_eq!(stars(9.0), "★★★★★");
    }

    #[test]
    fn test_product_message_card_truncates_for_display_only() {
        let mut r = review();
        r.review_text = "a".repeat(200);
        let msg = Message::product(&r);
        let rendered = render_message(&msg);
        assert!(rendered.contains(&format!("{}...", "a".repeat(CARD_PREVIEW_CHARS))));
        assert!(!rendered.contains(&"a".repeat(CARD_PREVIEW_CHARS + 1)));
        assert!(rendered.contains("seeksense product 1077"));
        assert_eq!(msg.text.len(), 200);
    }

    #[test]
    fn test_loading_placeholder_renders_indicator() {
        assert!(render_message(&Message::loading()).contains("Searching..."));
    }

    #[test]
    fn test_empty_table_has_placeholder_row() {
        let out = render_table(&[]);
        assert!(out.contains("No results found."));
        assert!(out.contains("ClothingID"));
    }

    #[test]
    fn test_product_card_shows_only_present_fields() {
        let out = render_product_card(&review());
        assert!(out.contains("Clothing ID: 1077"));
        assert!(!out.contains("Age:"));
        assert!(out.contains("Not Recommended"));
        assert!(out.contains("0 helpful"));
        assert!(out.contains("General › Dresses"));
        assert!(out.contains("(4.5)"));

        let mut bare = review();
        bare.title.clear();
        bare.recommended = None;
        bare.positive_feedback_count = None;
        let out = render_product_card(&bare);
        assert!(out.contains("Untitled Review"));
        assert!(!out.contains("Recommended"));
        assert!(!out.contains("helpful"));
    }

    #[test]
    fn test_empty_state_renders_not_found() {
        assert!(render_product_state(&ProductState::Empty).contains("Review not found"));
    }
}
