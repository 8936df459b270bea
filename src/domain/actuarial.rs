use serde::Serialize;

use super::UserProfile;

const DEFAULT_LIFE_EXPECTANCY: i32 = 78;

const DISEASE_YEARS_LOST: [(&str, i32); 15] = [
    ("diabetes", 3),
    ("hypertension", 2),
    ("heart_disease", 4),
    ("copd", 4),
    ("cancer", 5),
    ("arthritis", 1),
    ("asthma", 2),
    ("stroke", 4),
    ("kidney_disease", 3),
    ("liver_disease", 4),
    ("osteoporosis", 2),
    ("depression", 1),
    ("anxiety", 1),
    ("obesity", 2),
    ("high_cholesterol", 1),
];

const FAMILY_HISTORY_YEARS: [(&str, i32); 2] = [("cancer", -2), ("alzheimer", -2)];

const LIFESTYLE_BONUS_YEARS: [(&str, i32); 3] =
    [("basketball", 1), ("non-smoker", 1), ("no alcohol", 1)];

const REGIONAL_BASE_COSTS: [(&str, [f64; 4]); 4] = [
    ("usa", [2000.0, 3000.0, 4000.0, 6000.0]),
    ("europe", [1500.0, 2250.0, 3000.0, 4500.0]),
    ("asia", [1000.0, 1500.0, 2000.0, 3000.0]),
    ("turkey", [800.0, 1200.0, 1600.0, 2400.0]),
];

const AGE_BANDS: [&str; 4] = ["30-39", "40-49", "50-59", "60+"];

const CONDITION_COST_WEIGHTS: [(&str, f64); 10] = [
    ("diabetes", 0.96),
    ("hypertension", 0.72),
    ("heart_disease", 1.20),
    ("asthma", 0.33),
    ("cancer", 1.44),
    ("copd", 0.96),
    ("depression", 0.48),
    ("obesity", 0.72),
    ("alzheimer", 1.20),
    ("bone_cancer", 1.44),
];

const FAMILY_HISTORY_COST_WEIGHTS: [(&str, f64); 5] = [
    ("cancer", 0.15),
    ("heart_disease", 0.20),
    ("diabetes", 0.15),
    ("alzheimer", 0.15),
    ("bone_cancer", 0.15),
];

const SPORTS: [&str; 5] = ["basketball", "football", "tennis", "swimming", "running"];

const INSURANCE_INCOME_THRESHOLD: f64 = 2000.0;
const INSURANCE_DISCOUNT: f64 = 0.3;
const LIFESTYLE_RISK_PER_POINT: f64 = 0.03;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongevityEstimate {
    pub base_expectancy: i32,
    pub lifestyle_bonus: i32,
    pub disease_penalty: i32,
    pub expected_life: i32,
    /// 0 (low) to 100 (high).
    pub risk_score: i32,
    pub details: Vec<String>,
}

impl LongevityEstimate {
    pub fn render(&self) -> String {
        format!(
            "Longevity estimate:\n{}\nExpected lifespan: {} years\nRisk score: {}/100 (higher is worse)",
            self.details.join("\n"),
            self.expected_life,
            self.risk_score
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCostEstimate {
    pub age_band: &'static str,
    pub base_cost: f64,
    pub lifestyle_score: u32,
    pub total_risk: f64,
    pub cost_before_insurance: f64,
    pub insured: bool,
    pub annual_cost: f64,
    pub details: Vec<String>,
}

impl HealthCostEstimate {
    pub fn render(&self) -> String {
        format!(
            "Health cost estimate:\n{}\nEstimated annual health cost: ${:.2}",
            self.details.join("\n"),
            self.annual_cost
        )
    }
}

fn conditions(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(|c| c.trim().to_lowercase().replace([' ', '-'], "_"))
        .filter(|c| !c.is_empty() && c != "null" && c != "none")
        .collect()
}

fn lookup<T: Copy>(table: &[(&str, T)], key: &str) -> Option<T> {
    table.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

pub fn estimate_longevity(profile: &UserProfile) -> LongevityEstimate {
    let mut details = Vec::new();

    let gender = profile.gender.trim().to_lowercase();
    let mut base = match gender.as_str() {
        "male" => 76,
        "female" => 81,
        _ => DEFAULT_LIFE_EXPECTANCY,
    };
    details.push(format!("Base life expectancy ({}): {base} years", profile.gender));

    let education_years = match profile.education_level.trim().to_lowercase().as_str() {
        "primary" => -2,
        "high school" => -1,
        _ => 0,
    };
    if education_years != 0 {
        details.push(format!(
            "Education: {} ({education_years} years)",
            profile.education_level
        ));
    }
    base += education_years;

    let income_years = if profile.monthly_income < 3000.0 {
        -2
    } else if profile.monthly_income < 6000.0 {
        -1
    } else {
        0
    };
    if income_years != 0 {
        details.push(format!(
            "Monthly income {:.0} ({income_years} years)",
            profile.monthly_income
        ));
    }
    base += income_years;

    if profile.marital_status.trim().eq_ignore_ascii_case("single") {
        details.push("Marital status: single (-1 year)".to_string());
        base -= 1;
    }

    let family = profile
        .family_health_history
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    for (condition, years) in FAMILY_HISTORY_YEARS {
        if family.contains(condition) {
            details.push(format!("Family history of {condition} ({years} years)"));
            base += years;
        }
    }

    let lifestyle = profile
        .lifestyle_habits
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();
    let lifestyle_bonus: i32 = LIFESTYLE_BONUS_YEARS
        .iter()
        .filter(|(habit, _)| lifestyle.contains(habit))
        .map(|(_, years)| years)
        .sum();
    details.push(format!("Lifestyle bonus: +{lifestyle_bonus} years"));

    let disease_penalty: i32 = conditions(profile.chronic_diseases.as_deref())
        .iter()
        .filter_map(|c| lookup(&DISEASE_YEARS_LOST, c))
        .sum();
    details.push(format!("Chronic disease penalty: -{disease_penalty} years"));

    let age = profile.age as i32;
    let expected_life = (base + lifestyle_bonus - disease_penalty).max(age);
    let risk_score = (100 - (expected_life - age) * 2).clamp(0, 100);

    LongevityEstimate {
        base_expectancy: base,
        lifestyle_bonus,
        disease_penalty,
        expected_life,
        risk_score,
        details,
    }
}

fn age_band(age: u32) -> usize {
    match age {
        0..=39 => 0,
        40..=49 => 1,
        50..=59 => 2,
        _ => 3,
    }
}

/// Habit score out of 10: exercise frequency, smoking, alcohol and diet.
pub fn lifestyle_score(habits: &str) -> u32 {
    let habits = habits.to_lowercase();
    let mut score = 0;

    if SPORTS.iter().any(|sport| habits.contains(sport)) {
        if habits.contains("weekly") {
            score += 3;
        } else if habits.contains("monthly") {
            score += 2;
        } else if habits.contains("occasionally") {
            score += 1;
        }
    }
    if habits.contains("non-smoker") {
        score += 2;
    }
    if habits.contains("no alcohol") {
        score += 2;
    }
    score += if habits.contains("healthy diet") || habits.contains("balanced diet") {
        3
    } else {
        1
    };

    score.min(10)
}

pub fn estimate_health_cost(profile: &UserProfile) -> HealthCostEstimate {
    let mut details = Vec::new();

    let band = age_band(profile.age);
    let region = profile.location.trim().to_lowercase();
    let base_cost = match lookup(&REGIONAL_BASE_COSTS, &region) {
        Some(costs) => costs[band],
        None => {
            let all: Vec<f64> = REGIONAL_BASE_COSTS
                .iter()
                .flat_map(|(_, costs)| costs.iter().copied())
                .collect();
            all.iter().sum::<f64>() / all.len() as f64
        }
    };
    details.push(format!(
        "Base cost for {} aged {}: ${base_cost:.2}",
        profile.location, AGE_BANDS[band]
    ));

    let chronic_risk: f64 = conditions(profile.chronic_diseases.as_deref())
        .iter()
        .filter_map(|c| lookup(&CONDITION_COST_WEIGHTS, c))
        .sum();
    if chronic_risk > 0.0 {
        details.push(format!("Chronic conditions: +{chronic_risk:.2}"));
    }

    let family_risk: f64 = conditions(profile.family_health_history.as_deref())
        .iter()
        .filter_map(|c| lookup(&FAMILY_HISTORY_COST_WEIGHTS, c))
        .sum();
    if family_risk > 0.0 {
        details.push(format!("Family history: +{family_risk:.2}"));
    }

    let score = lifestyle_score(profile.lifestyle_habits.as_deref().unwrap_or_default());
    let lifestyle_risk = f64::from(10 - score) * LIFESTYLE_RISK_PER_POINT;
    details.push(format!("Lifestyle score {score}/10: +{lifestyle_risk:.2}"));

    let total_risk = chronic_risk + family_risk + lifestyle_risk;
    let cost_before_insurance = base_cost * (1.0 + total_risk);
    details.push(format!(
        "Cost before insurance: ${base_cost:.2} x (1 + {total_risk:.2}) = ${cost_before_insurance:.2}"
    ));

    let insured = profile.monthly_income >= INSURANCE_INCOME_THRESHOLD;
    let annual_cost = if insured {
        details.push(format!(
            "Insurance discount: {:.0}%",
            INSURANCE_DISCOUNT * 100.0
        ));
        cost_before_insurance * (1.0 - INSURANCE_DISCOUNT)
    } else {
        details.push("No insurance discount".to_string());
        cost_before_insurance
    };

    HealthCostEstimate {
        age_band: AGE_BANDS[band],
        base_cost,
        lifestyle_score: score,
        total_risk,
        cost_before_insurance,
        insured,
        annual_cost: (annual_cost * 100.0).round() / 100.0,
        details,
    }
}
