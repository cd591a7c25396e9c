use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub const WELCOME_TEXT: &str = "Welcome to SeekSense! How can I assist you today?";
pub const RESULTS_TEXT: &str = "Here are some of the product reviews I compiled for you 🔍";
pub const NO_RESULTS_TEXT: &str = "No results found. Please try again with different keywords.";
pub const ERROR_TEXT: &str = "Sorry, I encountered an error while searching. Please try again.";

/// Numeric value as the backend may send it: SQL rows come through as ints,
/// floats, or strings depending on the driver and cache path.
#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleNumber {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl FlexibleNumber {
    fn into_f64(self) -> Result<Option<f64>, String> {
        match self {
            FlexibleNumber::Int(i) => Ok(Some(i as f64)),
            FlexibleNumber::Float(f) => Ok(Some(f)),
            FlexibleNumber::Bool(b) => Ok(Some(if b { 1.0 } else { 0.0 })),
            FlexibleNumber::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse::<f64>()
                    .map(Some)
                    .map_err(|e| format!("invalid number '{s}': {e}"))
            }
        }
    }
}

fn non_negative_u32(value: f64) -> Result<u32, String> {
    if value < 0.0 || value > u32::MAX as f64 {
        return Err(format!("{value} is out of range"));
    }
    Ok(value as u32)
}

fn deserialize_flexible_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = FlexibleNumber::deserialize(deserializer)?
        .into_f64()
        .map_err(D::Error::custom)?
        .ok_or_else(|| D::Error::custom("missing numeric value"))?;
    non_negative_u32(value).map_err(D::Error::custom)
}

fn deserialize_flexible_u32_opt<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<FlexibleNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(n) => match n.into_f64().map_err(D::Error::custom)? {
            None => Ok(None),
            Some(v) => non_negative_u32(v).map(Some).map_err(D::Error::custom),
        },
    }
}

/// Ratings are clamped to 0..=5 and snapped to half points.
fn deserialize_rating<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<FlexibleNumber>::deserialize(deserializer)? {
        None => return Ok(0.0),
        Some(n) => n.into_f64().map_err(D::Error::custom)?.unwrap_or(0.0),
    };
    Ok(normalize_rating(raw))
}

pub fn normalize_rating(raw: f64) -> f32 {
    let clamped = raw.clamp(0.0, 5.0);
    ((clamped * 2.0).round() / 2.0) as f32
}

fn deserialize_nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// `recommendedind` is stored as an integer flag; null means "unknown".
fn deserialize_tri_state<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<FlexibleNumber>::deserialize(deserializer)? {
        None => Ok(None),
        Some(n) => Ok(n.into_f64().map_err(D::Error::custom)?.map(|v| v != 0.0)),
    }
}

/// One backend record: a rated product comment plus its catalogue metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(
        rename = "clothingid",
        alias = "clothingId",
        alias = "ClothingID",
        deserialize_with = "deserialize_flexible_u32"
    )]
    pub clothing_id: u32,

    #[serde(
        default,
        alias = "Title",
        deserialize_with = "deserialize_nullable_string"
    )]
    pub title: String,

    #[serde(
        rename = "reviewtext",
        default,
        alias = "reviewText",
        alias = "ReviewText",
        deserialize_with = "deserialize_nullable_string"
    )]
    pub review_text: String,

    #[serde(default, alias = "Rating", deserialize_with = "deserialize_rating")]
    pub rating: f32,

    #[serde(
        rename = "divisionname",
        default,
        alias = "divisionName",
        alias = "DivisionName",
        deserialize_with = "deserialize_nullable_string"
    )]
    pub division_name: String,

    #[serde(
        rename = "departmentname",
        default,
        alias = "departmentName",
        alias = "DepartmentName",
        deserialize_with = "deserialize_nullable_string"
    )]
    pub department_name: String,

    #[serde(
        rename = "classname",
        default,
        alias = "className",
        alias = "ClassName",
        deserialize_with = "deserialize_nullable_string"
    )]
    pub class_name: String,

    #[serde(
        default,
        alias = "Age",
        deserialize_with = "deserialize_flexible_u32_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<u32>,

    #[serde(
        rename = "recommendedind",
        default,
        alias = "recommendedInd",
        alias = "RecommendedIND",
        deserialize_with = "deserialize_tri_state",
        skip_serializing_if = "Option::is_none"
    )]
    pub recommended: Option<bool>,

    #[serde(
        rename = "positivefeedbackcount",
        default,
        alias = "positiveFeedbackCount",
        alias = "PositiveFeedbackCount",
        deserialize_with = "deserialize_flexible_u32_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub positive_feedback_count: Option<u32>,
}

/// Body of `POST /api/reviews/search`
#[derive(Debug, Serialize)]
pub struct SearchRequest<'a> {
    pub query: &'a str,
}

/// What a transcript entry carries beyond its text
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    #[default]
    Plain,
    Product {
        title: String,
        rating: f32,
        clothing_id: u32,
    },
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Chat transcript entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    #[serde(rename = "self")]
    pub from_user: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub loading: bool,
    #[serde(default)]
    pub kind: MessageKind,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_user: true,
            loading: false,
            kind: MessageKind::Plain,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            from_user: false,
            loading: false,
            kind: MessageKind::Plain,
        }
    }

    /// Typing placeholder shown while a search is in flight
    pub fn loading() -> Self {
        Self {
            text: String::new(),
            from_user: false,
            loading: true,
            kind: MessageKind::Plain,
        }
    }

    pub fn welcome() -> Self {
        Self::system(WELCOME_TEXT)
    }

    /// Product card for a review. Keeps the full review text.
    pub fn product(review: &Review) -> Self {
        Self {
            text: review.review_text.clone(),
            from_user: false,
            loading: false,
            kind: MessageKind::Product {
                title: review.title.clone(),
                rating: review.rating,
                clothing_id: review.clothing_id,
            },
        }
    }

    pub fn is_product(&self) -> bool {
        matches!(self.kind, MessageKind::Product { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_decodes_lowercase_sql_row() {
        let raw = r#"{
            "clothingid": 1077,
            "age": 53,
            "title": "Some major design flaws",
            "reviewtext": "I had such high hopes for this dress",
            "rating": 3,
            "recommendedind": 0,
            "positivefeedbackcount": 0,
            "divisionname": "General",
            "departmentname": "Dresses",
            "classname": "Dresses"
        }"#;
        let review: Review = serde_json::from_str(raw).expect("row should decode");
        assert_eq!(review.clothing_id, 1077);
        assert_eq!(review.age, Some(53));
        assert_eq!(review.rating, 3.0);
        assert_eq!(review.recommended, Some(false));
        assert_eq!(review.positive_feedback_count, Some(0));
        assert_eq!(review.department_name, "Dresses");
    }

    #[test]
    fn test_review_tolerates_nulls_and_pascal_case() {
        let raw = r#"{
            "ClothingID": "862",
            "Title": null,
            "ReviewText": "Love this top",
            "Rating": "4.4",
            "RecommendedIND": null,
            "PositiveFeedbackCount": null,
            "DivisionName": "General Petite"
        }"#;
        let review: Review = serde_json::from_str(raw).expect("row should decode");
        assert_eq!(review.clothing_id, 862);
        assert_eq!(review.title, "");
        assert_eq!(review.rating, 4.5);
        assert_eq!(review.recommended, None);
        assert_eq!(review.positive_feedback_count, None);
        assert_eq!(review.age, None);
        assert_eq!(review.division_name, "General Petite");
        assert_eq!(review.class_name, "");
    }

    #[test]
    fn test_review_requires_clothing_id() {
        let raw = r#"{ "title": "orphan" }"#;
        assert!(serde_json::from_str::<Review>(raw).is_err());
    }

    #[test]
    fn test_rating_is_clamped_to_half_points() {
        assert_eq!(normalize_rating(7.0), 5.0);
        assert_eq!(normalize_rating(-1.0), 0.0);
        assert_eq!(normalize_rating(2.26), 2.5);
        assert_eq!(normalize_rating(2.2), 2.0);
    }

    #[test]
    fn test_plain_message_omits_loading_flag() {
        let json = serde_json::to_value(Message::user("blue dress")).expect("serialize");
        assert_eq!(json["self"], true);
        assert!(json.get("loading").is_none());
        assert_eq!(json["kind"]["type"], "plain");
    }

    #[test]
    fn test_message_without_kind_decodes_as_plain() {
        let msg: Message =
            serde_json::from_str(r#"{"text":"hi","self":false}"#).expect("decode");
        assert_eq!(msg, Message::system("hi"));
    }

    #[test]
    fn test_product_message_keeps_full_text() {
        let text = "x".repeat(400);
        let review = Review {
            clothing_id: 7,
            title: "Soft".to_string(),
            review_text: text.clone(),
            rating: 4.0,
            division_name: String::new(),
            department_name: String::new(),
            class_name: String::new(),
            age: None,
            recommended: None,
            positive_feedback_count: None,
        };
        let msg = Message::product(&review);
        assert_eq!(msg.text, text);
        assert!(msg.is_product());
        assert_eq!(
            msg.kind,
            MessageKind::Product {
                title: "Soft".to_string(),
                rating: 4.0,
                clothing_id: 7
            }
        );
    }
}
