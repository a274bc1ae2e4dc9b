use chrono::Utc;
use colored::*;
use comfy_table::Table;
use indicatif::{ProgressBar, ProgressStyle};
use inquire::Select;

use crate::models::PodSnapshot;
use crate::session::Controller;

// --- SHARED SPINNER ---
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}

// --- NAMESPACE SELECTION ---
/// Missing `-n`: context namespace. Bare `-n`: interactive menu. `-n NS`: NS.
pub async fn select_namespace(
    controller: &Controller,
    token: &str,
    arg: Option<Option<String>>,
    context_namespace: &str,
) -> anyhow::Result<String> {
    match arg {
        None => {
            println!("Using context namespace: {}", context_namespace.cyan());
            Ok(context_namespace.to_string())
        }
        Some(None) => {
            let pb = create_spinner("Fetching namespaces...");
            let names = controller.list_namespaces(token).await;
            pb.finish_and_clear();
            Ok(Select::new("Select namespace:", names?).prompt()?)
        }
        Some(Some(ns)) => Ok(ns),
    }
}

// --- ONE-SHOT TABLE ---
pub fn print_pods(namespace: &str, snapshot: &PodSnapshot) {
    println!("\n{}", format!("--- PODS IN {} ---", namespace).bold().bright_white());
    if snapshot.rows.is_empty() {
        println!("   (No pods)");
        return;
    }

    let now = Utc::now();
    let mut table = Table::new();
    table.set_header(vec!["NAME", "STATUS", "AGE"]);
    for row in &snapshot.rows {
        let status = if row.phase == "Running" { row.phase.green() } else { row.phase.red() };
        table.add_row(vec![row.name.clone(), status.to_string(), row.age(now)]);
    }
    println!("{table}");
}
