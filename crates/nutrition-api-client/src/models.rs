//! Wire types for the nutrition service.
//!
//! Field names follow the service's camelCase JSON. Types whose contents
//! are computed server-side keep unrecognized fields in `extra`.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub type ExtraFields = BTreeMap<String, serde_json::Value>;

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub registration_source: String,
}

impl RegisterRequest {
    pub const CREDENTIAL_SOURCE: &'static str = "CREDENTIAL";

    pub fn credential(
        name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            registration_source: Self::CREDENTIAL_SOURCE.to_string(),
        }
    }
}

/// Response of the login, register and OAuth exchange endpoints, and of
/// `GET /auth/me` (which omits `token`).
///
/// Every field is optional because the service is not consistent about
/// which ones it returns. `id` is accepted as either a string or a number.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_completed: Option<bool>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl AuthPayload {
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Default::default()
        }
    }
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        match Option::<serde_json::Value>::deserialize(deserializer)? {
            Some(serde_json::Value::String(s)) => Some(s),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        },
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthGoal {
    WeightLoss,
    MuscleGain,
    Maintenance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DietPreference {
    Vegan,
    Keto,
    Vegetarian,
    Omnivore,
}

macro_rules! impl_wire_name {
    ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }

        impl std::str::FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Self::$variant),)+
                    other => Err(format!("unknown value '{}'", other)),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_wire_name!(HealthGoal {
    WeightLoss => "weight_loss",
    MuscleGain => "muscle_gain",
    Maintenance => "maintenance",
});

impl_wire_name!(DietPreference {
    Vegan => "vegan",
    Keto => "keto",
    Vegetarian => "vegetarian",
    Omnivore => "omnivore",
});

/// Body of `PUT /user-profile/{userId}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub age: u32,
    pub weight: f64,
    pub height: f64,
    pub health_goal: HealthGoal,
    pub diet_preference: DietPreference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl_wire_name!(MealType {
    Breakfast => "breakfast",
    Lunch => "lunch",
    Dinner => "dinner",
    Snack => "snack",
});

/// Body of `POST /food/{userId}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodLogRequest {
    pub meal_type: MealType,
    pub food_name: String,
    pub calories: u32,
    pub date: NaiveDate,
}

/// Body of `POST /water/{userId}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterLogRequest {
    pub glasses: u32,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodLogEntry {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    pub meal_type: String,
    pub food_name: String,
    pub calories: u32,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterLogEntry {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    pub glasses: u32,
    pub date: NaiveDate,
}

/// Response of `POST /food/{userId}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodLogResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub food_log: Option<FoodLogEntry>,
}

/// Response of `POST /water/{userId}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterLogResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub water_log: Option<WaterLogEntry>,
}

/// Response of `GET /progress/daily/{userId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyProgress {
    pub calories_consumed: f64,
    pub calorie_goal: f64,
    pub calories_remaining: f64,
    pub water_consumed: f64,
    pub water_goal: f64,
    pub food_logs: Vec<FoodLogEntry>,
    pub water_logs: Vec<WaterLogEntry>,
    pub calorie_status: Option<String>,
    pub water_status: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// Response of `GET /progress/weekly/{userId}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WeeklyProgress {
    pub daily_calories: BTreeMap<String, f64>,
    pub daily_water: BTreeMap<String, f64>,
    pub days_calorie_goal_met: u32,
    pub days_water_goal_met: u32,
    pub calorie_goal: f64,
    pub water_goal: f64,
    pub summary: Option<String>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn auth_payload_accepts_numeric_id_and_keeps_extras() {
        let payload: AuthPayload = serde_json::from_value(json!({
            "token": "t1",
            "id": 42,
            "name": "A",
            "email": "a@b.com",
            "profileCompleted": true,
            "profileImage": "img.png",
            "followingUsers": []
        }))
        .unwrap();

        assert_eq!(payload.token.as_deref(), Some("t1"));
        assert_eq!(payload.id.as_deref(), Some("42"));
        assert_eq!(payload.profile_completed, Some(true));
        assert_eq!(payload.extra.get("profileImage"), Some(&json!("img.png")));
        assert!(payload.extra.contains_key("followingUsers"));
    }

    #[test]
    fn auth_payload_treats_null_fields_as_absent() {
        let payload: AuthPayload =
            serde_json::from_value(json!({ "token": "t", "id": null, "name": null })).unwrap();
        assert_eq!(payload.id, None);
        assert_eq!(payload.name, None);
        assert_eq!(payload.profile_completed, None);
    }

    #[test]
    fn register_request_carries_credential_source() {
        let body = serde_json::to_value(RegisterRequest::credential("A", "a@b.com", "x")).unwrap();
        assert_eq!(body["registrationSource"], "CREDENTIAL");
        assert_eq!(body["email"], "a@b.com");
    }

    #[test]
    fn profile_update_uses_snake_case_choices() {
        let body = serde_json::to_value(ProfileUpdate {
            age: 30,
            weight: 70.5,
            height: 175.0,
            health_goal: HealthGoal::WeightLoss,
            diet_preference: DietPreference::Omnivore,
        })
        .unwrap();

        assert_eq!(body["healthGoal"], "weight_loss");
        assert_eq!(body["dietPreference"], "omnivore");
        assert_eq!("muscle_gain".parse::<HealthGoal>(), Ok(HealthGoal::MuscleGain));
        assert!("paleo".parse::<DietPreference>().is_err());
    }

    #[test]
    fn daily_progress_tolerates_missing_and_unknown_fields() {
        let progress: DailyProgress = serde_json::from_value(json!({
            "caloriesConsumed": 1200,
            "calorieGoal": 2000,
            "foodLogs": [{
                "id": 7,
                "mealType": "lunch",
                "foodName": "Salad",
                "calories": 300,
                "date": "2024-05-01"
            }],
            "streak": 3
        }))
        .unwrap();

        assert_eq!(progress.calories_consumed, 1200.0);
        assert_eq!(progress.water_goal, 0.0);
        assert_eq!(progress.food_logs[0].id.as_deref(), Some("7"));
        assert_eq!(progress.extra.get("streak"), Some(&json!(3)));
    }
}
