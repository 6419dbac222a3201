//! Demo data generator
//!
//! Produces a year of sample records for every registered collection:
//! - weekly Sunday services (attendance, offerings, tithes)
//! - monthly expenses, welfare, projects and side-business entries
//! - a small member roster joining through the year
//!
//! Values follow a gentle seasonal curve so charts are not flat. Output is
//! deterministic apart from record ids.

use std::f64::consts::PI;

use chrono::{Datelike, Duration, NaiveDate};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::ports::Record;

const MEMBERS: &[(&str, &str, &str)] = &[
    ("Ama", "Mensah", "F"),
    ("Kofi", "Boateng", "M"),
    ("Esi", "Owusu", "F"),
    ("Yaw", "Asante", "M"),
    ("Abena", "Darko", "F"),
    ("Kwame", "Nkrumah", "M"),
    ("Akosua", "Frimpong", "F"),
    ("Kojo", "Appiah", "M"),
    ("Adwoa", "Sarpong", "F"),
    ("Kwesi", "Ofori", "M"),
];

const PROJECTS: &[&str] = &["Sanctuary Roof", "Youth Centre"];
const GROUPS: &[&str] = &["Men's Fellowship", "Women's Fellowship", "Youth Ministry"];
const DEPARTMENTS: &[&str] = &["Choir", "Ushering", "Children's Ministry"];

/// Seasonal multiplier for a day of the year, between 0.85 and 1.15
fn season(date: NaiveDate) -> f64 {
    1.0 + 0.15 * (2.0 * PI * date.ordinal() as f64 / 365.0).sin()
}

fn money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn record(value: JsonValue) -> Record {
    let mut record = match value {
        JsonValue::Object(map) => map,
        _ => Record::new(),
    };
    record.insert("id".to_string(), JsonValue::String(Uuid::new_v4().to_string()));
    record
}

fn sundays(year: i32) -> Vec<NaiveDate> {
    let Some(first) = NaiveDate::from_ymd_opt(year, 1, 1) else {
        return Vec::new();
    };
    let offset = (7 - first.weekday().num_days_from_sunday()) % 7;
    let mut out = Vec::new();
    let mut date = first + Duration::days(offset as i64);
    while date.year() == year {
        out.push(date);
        date += Duration::days(7);
    }
    out
}

fn month_days(year: i32, day_of_month: u32) -> Vec<NaiveDate> {
    (1..=12)
        .filter_map(|month| NaiveDate::from_ymd_opt(year, month, day_of_month))
        .collect()
}

fn monthly(f: impl Fn(usize, NaiveDate) -> JsonValue, dates: &[NaiveDate]) -> Vec<Record> {
    dates.iter().enumerate().map(|(i, d)| record(f(i, *d))).collect()
}

/// Generate sample records grouped by collection
pub fn generate_demo_records(year: i32) -> Vec<(&'static str, Vec<Record>)> {
    let sundays = sundays(year);
    let mid_month = month_days(year, 15);
    let month_start = month_days(year, 3);

    let mut attendance = Vec::new();
    let mut offerings = Vec::new();
    let mut aggregates = Vec::new();
    let mut tithes = Vec::new();
    for (week, sunday) in sundays.iter().enumerate() {
        let factor = season(*sunday);
        let men = (38.0 * factor).round();
        let women = (52.0 * factor).round();
        let children = (27.0 * factor).round();
        attendance.push(record(json!({
            "service_date": day(*sunday),
            "service_type": "Sunday Service",
            "men": men,
            "women": women,
            "children": children,
            "total_attendance": men + women + children,
        })));
        offerings.push(record(json!({
            "service_date": day(*sunday),
            "service_type": "Sunday Service",
            "amount": money(640.0 * factor),
            "counted_by": "Finance Committee",
        })));
        aggregates.push(record(json!({
            "service_date": day(*sunday),
            "service_type": "Sunday Service",
            "total_amount": money(410.0 * factor),
            "contributors": 18 + (week % 5),
        })));

        let (first, last, _) = MEMBERS[week % MEMBERS.len()];
        tithes.push(record(json!({
            "giving_date": day(*sunday),
            "member_name": format!("{first} {last}"),
            "amount": money(150.0 + 10.0 * (week % 7) as f64),
            "payment_method": if week % 3 == 0 { "Mobile Money" } else { "Cash" },
        })));
    }

    let members: Vec<Record> = MEMBERS
        .iter()
        .enumerate()
        .filter_map(|(i, (first, last, gender))| {
            let joined = NaiveDate::from_ymd_opt(year, (i as u32 % 12) + 1, 5)?;
            Some(record(json!({
                "first_name": first,
                "last_name": last,
                "gender": gender,
                "email": if i % 3 == 2 { JsonValue::Null } else {
                    json!(format!("{}.{}@example.org", first.to_lowercase(), last.to_lowercase()))
                },
                "status": "Active",
                "join_date": day(joined),
            })))
        })
        .collect();

    vec![
        ("members", members),
        ("attendance", attendance),
        ("service_offerings", offerings),
        ("tithe_aggregates", aggregates),
        ("tithes", tithes),
        ("special_funds", monthly(|_, d| json!({
            "giving_date": day(d),
            "fund_name": "Missions Fund",
            "amount": money(220.0 * season(d)),
        }), &mid_month)),
        ("welfare_contributions", monthly(|i, d| json!({
            "contribution_date": day(d),
            "member_name": format!("{} {}", MEMBERS[i % MEMBERS.len()].0, MEMBERS[i % MEMBERS.len()].1),
            "amount": 50.0,
            "payment_method": "Cash",
        }), &month_start)),
        ("welfare_disbursements", monthly(|i, d| json!({
            "disbursement_date": day(d),
            "beneficiary_name": format!("{} {}", MEMBERS[(i + 4) % MEMBERS.len()].0, MEMBERS[(i + 4) % MEMBERS.len()].1),
            "amount": 120.0,
            "reason": if i % 2 == 0 { "Hospital bill" } else { "Bereavement support" },
        }), &mid_month)),
        ("project_contributions", monthly(|i, d| json!({
            "contribution_date": day(d),
            "project_name": PROJECTS[i % PROJECTS.len()],
            "contributor_name": format!("{} {}", MEMBERS[i % MEMBERS.len()].0, MEMBERS[i % MEMBERS.len()].1),
            "amount": money(300.0 * season(d)),
        }), &month_start)),
        ("project_expenses", monthly(|i, d| json!({
            "expense_date": day(d),
            "project_name": PROJECTS[i % PROJECTS.len()],
            "paid_to": "BuildRight Supplies",
            "description": "Materials",
            "amount": 260.0,
        }), &mid_month)),
        ("business_income", monthly(|_, d| json!({
            "income_date": day(d),
            "business_name": "Church Bookshop",
            "amount": money(180.0 * season(d)),
        }), &mid_month)),
        ("business_expenses", monthly(|_, d| json!({
            "expense_date": day(d),
            "business_name": "Church Bookshop",
            "description": "Stock replenishment",
            "amount": 95.0,
        }), &month_start)),
        ("event_offerings", monthly(|i, d| json!({
            "event_date": day(d),
            "event_name": if i == 3 { "Easter Convention" } else if i == 11 { "Carols Night" } else { "Monthly Revival" },
            "amount": if i == 3 || i == 11 { 900.0 } else { 140.0 },
        }), &mid_month)),
        ("group_offerings", monthly(|i, d| json!({
            "meeting_date": day(d),
            "group_name": GROUPS[i % GROUPS.len()],
            "amount": 75.0,
        }), &month_start)),
        ("department_offerings", monthly(|i, d| json!({
            "offering_date": day(d),
            "department_name": DEPARTMENTS[i % DEPARTMENTS.len()],
            "amount": 60.0,
        }), &mid_month)),
        ("pledge_payments", monthly(|i, d| json!({
            "payment_date": day(d),
            "pledge_title": "Building Pledge",
            "member_name": format!("{} {}", MEMBERS[(i + 2) % MEMBERS.len()].0, MEMBERS[(i + 2) % MEMBERS.len()].1),
            "amount": 100.0,
            "payment_method": "Bank Transfer",
        }), &month_start)),
        ("income_entries", monthly(|_, d| json!({
            "entry_date": day(d),
            "category": "Hall Rental",
            "amount": 200.0,
        }), &mid_month)),
        ("expenses", monthly(|i, d| json!({
            "date_spent": day(d),
            "category": if i % 2 == 0 { "Utilities" } else { "Maintenance" },
            "description": if i % 2 == 0 { "Electricity and water" } else { "Generator servicing" },
            "paid_to": if i % 2 == 0 { "City Utilities" } else { "PowerGen Services" },
            "approved_by": "Treasurer",
            "amount": money(480.0 * season(d)),
        }), &month_start)),
        ("expense_entries", monthly(|_, d| json!({
            "entry_date": day(d),
            "category": "Stationery",
            "amount": 35.0,
        }), &mid_month)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::source::{all_sources, AUXILIARY_METRICS};
    use chrono::Weekday;

    #[test]
    fn test_sundays_are_sundays_within_year() {
        let days = sundays(2024);
        assert_eq!(days.len(), 52);
        assert!(days.iter().all(|d| d.weekday() == Weekday::Sun && d.year() == 2024));
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2024, 1, 7).unwrap());
    }

    #[test]
    fn test_every_registered_collection_is_seeded() {
        let generated = generate_demo_records(2024);
        let seeded: Vec<&str> = generated
            .iter()
            .filter(|(_, records)| !records.is_empty())
            .map(|(name, _)| *name)
            .collect();

        for collection in all_sources()
            .map(|s| s.collection)
            .chain(AUXILIARY_METRICS.iter().map(|m| m.collection))
        {
            assert!(seeded.contains(&collection), "{collection} not seeded");
        }
    }

    #[test]
    fn test_records_carry_ids() {
        for (_, records) in generate_demo_records(2024) {
            assert!(records.iter().all(|r| r.get("id").and_then(JsonValue::as_str).is_some()));
        }
    }
}
