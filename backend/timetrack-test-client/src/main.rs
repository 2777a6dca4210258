// src/main.rs

use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::error::Error;

// Response types
#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    token: String,
    user: UserInfo,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    id: String,
    email: String,
    name: String,
    role: String,
}

#[derive(Debug, Deserialize)]
struct ShiftInfo {
    id: String,
    date: String,
    start_time: String,
    end_time: String,
    task: String,
    duration_hours: f64,
}

#[derive(Debug, Deserialize)]
struct SummaryInfo {
    total_hours: f64,
    total_days: u32,
    completion_percentage: f64,
    target_hours: f64,
    target_days: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RollupInfo {
    employee_name: String,
    total_hours: f64,
    shift_count: usize,
}

fn bearer(token: &str) -> Result<header::HeaderMap, Box<dyn Error>> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::AUTHORIZATION,
        header::HeaderValue::from_str(&format!("Bearer {}", token))?,
    );
    Ok(headers)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let base_url = "http://localhost:3001";
    let client = Client::new();

    // Test 1: Health check
    println!("\n🔍 Testing health check endpoint...");
    let health_response = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json::<HealthResponse>()
        .await?;
    println!("Health check response: {:?}", health_response);

    // Test 2: Register an employee and an administrator
    println!("\n🔍 Registering test accounts...");
    let employee: AuthResponse = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({
            "name": "John Doe",
            "email": "john@example.com",
            "password": "hunter2",
            "role": "user"
        }))
        .send()
        .await?
        .json()
        .await?;
    println!("Registered employee: {:?}", employee.user);

    let admin: AuthResponse = client
        .post(format!("{}/api/auth/register", base_url))
        .json(&json!({
            "name": "Root Admin",
            "email": "admin@example.com",
            "password": "sekrit",
            "role": "admin"
        }))
        .send()
        .await?
        .json()
        .await?;
    println!("Registered admin: {:?}", admin.user);

    // Test 3: Login round-trip for the employee
    println!("\n🔍 Testing login...");
    let login: AuthResponse = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({
            "email": "john@example.com",
            "password": "hunter2",
            "role": "user"
        }))
        .send()
        .await?
        .json()
        .await?;
    println!("Logged in as: {} ({})", login.user.name, login.user.role);
    let token = login.token;

    // Test 4: Create shifts
    println!("\n🔍 Creating shifts...");
    for (date, start, end, task) in [
        ("2024-01-01", "09:00", "17:30", "Project Development"),
        ("2024-01-02", "09:00", "17:00", ""),
        ("2024-01-02", "18:00", "20:00", "Code Review"),
    ] {
        let response = client
            .post(format!("{}/api/timesheets", base_url))
            .headers(bearer(&token)?)
            .json(&json!({
                "date": date,
                "start_time": start,
                "end_time": end,
                "task": task,
                "comment": ""
            }))
            .send()
            .await?;
        println!("Create shift on {} -> {}", date, response.status());
        if response.status() == StatusCode::CREATED {
            let shift = response.json::<ShiftInfo>().await?;
            println!(
                "  {} {}-{} {} ({}h)",
                shift.date, shift.start_time, shift.end_time, shift.task, shift.duration_hours
            );
        }
    }

    // Test 5: An overnight shift must be rejected
    println!("\n🔍 Testing overnight shift rejection...");
    let rejected = client
        .post(format!("{}/api/timesheets", base_url))
        .headers(bearer(&token)?)
        .json(&json!({
            "date": "2024-01-03",
            "start_time": "22:00",
            "end_time": "06:00"
        }))
        .send()
        .await?;
    println!(
        "Overnight shift status: {} (expected 422): {}",
        rejected.status(),
        rejected.text().await?
    );

    // Test 6: Listing and summary
    println!("\n🔍 Fetching timesheet and summary...");
    let shifts: Vec<ShiftInfo> = client
        .get(format!("{}/api/timesheets", base_url))
        .headers(bearer(&token)?)
        .send()
        .await?
        .json()
        .await?;
    println!("Employee has {} shifts", shifts.len());

    let summary: SummaryInfo = client
        .get(format!("{}/api/timesheets/summary", base_url))
        .headers(bearer(&token)?)
        .send()
        .await?
        .json()
        .await?;
    println!(
        "Summary: {:.1}h / {:.0}h over {} of {} days -> {:.1}%",
        summary.total_hours,
        summary.target_hours,
        summary.total_days,
        summary.target_days,
        summary.completion_percentage
    );

    // Test 7: Update then delete the first shift, watching the summary move
    if let Some(first) = shifts.first() {
        println!("\n🔍 Updating shift {}...", first.id);
        let updated: ShiftInfo = client
            .put(format!("{}/api/timesheets/{}", base_url, first.id))
            .headers(bearer(&token)?)
            .json(&json!({ "end_time": "18:00" }))
            .send()
            .await?
            .json()
            .await?;
        println!("Updated duration: {}h", updated.duration_hours);

        println!("\n🔍 Deleting shift {}...", first.id);
        let delete_status = client
            .delete(format!("{}/api/timesheets/{}", base_url, first.id))
            .headers(bearer(&token)?)
            .send()
            .await?
            .status();
        println!("Delete status: {}", delete_status);

        let after: SummaryInfo = client
            .get(format!("{}/api/timesheets/summary", base_url))
            .headers(bearer(&token)?)
            .send()
            .await?
            .json()
            .await?;
        println!("Summary after delete: {:.1}h", after.total_hours);
    }

    // Test 8: Admin endpoints, first with the wrong role
    println!("\n🔍 Testing admin access control...");
    let forbidden = client
        .get(format!("{}/api/admin/timesheets", base_url))
        .headers(bearer(&token)?)
        .send()
        .await?;
    println!(
        "Employee token on admin endpoint: {} (expected 403)",
        forbidden.status()
    );

    let rollups: Vec<RollupInfo> = client
        .get(format!("{}/api/admin/rollups", base_url))
        .query(&[("search", "john")])
        .headers(bearer(&admin.token)?)
        .send()
        .await?
        .json()
        .await?;
    for rollup in &rollups {
        println!(
            "Rollup: {} -> {}h over {} shifts",
            rollup.employee_name, rollup.total_hours, rollup.shift_count
        );
    }

    println!("\n✅ Testing complete!");

    Ok(())
}
