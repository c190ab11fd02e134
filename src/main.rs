//! Command-line front end for the doctor schedule.
//!
//! Provides an interactive menu for browsing the schedule by status and
//! page, and for confirming, cancelling and completing appointments.

use std::io::{self, Write};
use std::process::ExitCode;

use fitbuddy_schedule::config::{self, Config};
use fitbuddy_schedule::pagination::PageToken;
use fitbuddy_schedule::{
    Appointment, AppointmentAction, AppointmentViewController, HttpScheduleApi, ScheduleError,
    SessionContext, StatusFilter,
};
use tracing_subscriber::EnvFilter;

struct ScheduleCLI {
    controller: AppointmentViewController<HttpScheduleApi>,
    running: bool,
}

impl ScheduleCLI {
    fn new(controller: AppointmentViewController<HttpScheduleApi>) -> Self {
        ScheduleCLI {
            controller,
            running: true,
        }
    }

    fn print_header(&self) {
        println!("\n{}", "=".repeat(60));
        println!("       {} v{}", config::APP_NAME.to_uppercase(), config::APP_VERSION);
        println!("{}", "=".repeat(60));
    }

    fn print_menu(&self) {
        println!("\n--- Main Menu ---");
        println!("1. Refresh schedule");
        println!("2. Change status filter");
        println!("3. Next page");
        println!("4. Previous page");
        println!("5. Go to page");
        println!("6. Confirm appointment");
        println!("7. Cancel appointment");
        println!("8. Complete appointment");
        println!("9. Exit");
        println!("{}", "-".repeat(20));
    }

    /// Read one line. `None` means stdin is closed.
    fn get_input(&self, prompt: &str, default: Option<&str>) -> Option<String> {
        if let Some(def) = default {
            print!("{} [{}]: ", prompt, def);
        } else {
            print!("{}: ", prompt);
        }
        io::stdout().flush().ok();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let input = input.trim();
                if input.is_empty() {
                    Some(default.unwrap_or("").to_string())
                } else {
                    Some(input.to_string())
                }
            }
        }
    }

    fn get_int_input(&self, prompt: &str, default: Option<usize>) -> Option<usize> {
        loop {
            let default_str = default.map(|d| d.to_string());
            let input = self.get_input(prompt, default_str.as_deref())?;

            if let Ok(value) = input.parse::<usize>() {
                return Some(value);
            }
            println!("Please enter a valid number");
        }
    }

    fn report(&self, result: Result<(), ScheduleError>, success: &str) {
        match result {
            Ok(()) => println!("\n{}", success),
            Err(e) if e.is_local() => println!("\n{}", e),
            Err(_) => {}
        }
    }

    fn show_schedule(&self) {
        if let Some(banner) = self.controller.error() {
            println!("\n!! {}", banner);
        }

        let counts = self
            .controller
            .counts()
            .iter()
            .map(|(filter, count)| {
                let marker = if *filter == self.controller.filter() { "*" } else { "" };
                format!("{}{} ({})", marker, filter, count)
            })
            .collect::<Vec<_>>()
            .join("  ");
        println!("\nFilters: {}", counts);

        let page = self.controller.visible();
        if page.is_empty() {
            println!("\nNo appointments on this page");
        } else if let Some((first, last)) = page.range {
            println!(
                "\n--- Showing {}-{} of {} appointments ---",
                first, last, page.total_items
            );
        }

        for (i, apt) in page.items.iter().enumerate() {
            self.print_row(i + 1, apt);
        }

        let window = self
            .controller
            .page_window()
            .iter()
            .map(|token| match token {
                PageToken::Page(n) if *n == page.page => format!("[{}]", n),
                PageToken::Page(n) => n.to_string(),
                PageToken::Ellipsis => "...".to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ");
        if !window.is_empty() {
            println!("\nPages: {}", window);
        }
    }

    fn print_row(&self, row: usize, apt: &Appointment) {
        let date = apt
            .appointment_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "no date".to_string());
        let slot = apt
            .time_slot
            .as_ref()
            .map(|s| s.to_string())
            .unwrap_or_default();
        println!(
            "  {:>2}. {:20} {} {:13} [{}]",
            row,
            apt.patient_name(),
            date,
            slot,
            apt.status
        );

        let actions = apt
            .available_actions()
            .iter()
            .map(|a| a.name())
            .collect::<Vec<_>>();
        if !actions.is_empty() {
            println!("      actions: {}", actions.join(", "));
        } else if apt.status.is_terminal() {
            if let Some(notes) = apt.doctor_notes.as_deref().filter(|n| !n.is_empty()) {
                println!("      notes: {}", notes);
            }
        }
    }

    fn refresh(&mut self) {
        println!("\nLoading schedule...");
        match self.controller.load() {
            Ok(count) => println!("\nLoaded {} appointments", count),
            Err(e) => println!("\nCould not load schedule: {}", e),
        }
        self.show_schedule();
    }

    fn change_filter(&mut self) {
        println!("\n--- Status Filter ---");
        for (i, filter) in StatusFilter::TABS.iter().enumerate() {
            println!("  {}. {}", i + 1, filter);
        }
        let Some(choice) = self.get_int_input("Select filter", Some(2)) else {
            return;
        };

        match StatusFilter::TABS.get(choice.wrapping_sub(1)) {
            Some(filter) => {
                self.controller.set_filter(*filter);
                self.show_schedule();
            }
            None => println!("Invalid choice"),
        }
    }

    fn go_to_page(&mut self) {
        if let Some(page) = self.get_int_input("Page number", Some(1)) {
            self.controller.set_page(page);
            self.show_schedule();
        }
    }

    /// Ask for a row on the current page offering `action`.
    fn pick_appointment(&self, action: AppointmentAction) -> Option<String> {
        let page = self.controller.visible();
        let candidates: Vec<(usize, &Appointment)> = page
            .items
            .iter()
            .enumerate()
            .filter(|(_, apt)| apt.allows(action))
            .map(|(i, apt)| (i + 1, *apt))
            .collect();

        if candidates.is_empty() {
            println!("\nNo appointments on this page offer '{}'", action);
            return None;
        }

        for (row, apt) in &candidates {
            self.print_row(*row, apt);
        }

        let choice = self.get_int_input("Select row (0 to go back)", Some(0))?;
        if choice == 0 {
            return None;
        }
        match candidates.iter().find(|(row, _)| *row == choice) {
            Some((_, apt)) => Some(apt.id.clone()),
            None => {
                println!("Invalid choice");
                None
            }
        }
    }

    fn confirm_appointment(&mut self) {
        println!("\n--- Confirm Appointment ---");
        if let Some(id) = self.pick_appointment(AppointmentAction::Confirm) {
            let result = self.controller.confirm(&id);
            self.report(result, "Appointment confirmed");
            self.show_schedule();
        }
    }

    fn cancel_appointment(&mut self) {
        println!("\n--- Cancel Appointment ---");
        if let Some(id) = self.pick_appointment(AppointmentAction::Cancel) {
            let result = self.controller.cancel(&id);
            self.report(result, "Appointment cancelled");
            self.show_schedule();
        }
    }

    fn complete_appointment(&mut self) {
        println!("\n--- Complete Appointment ---");
        let Some(id) = self.pick_appointment(AppointmentAction::Complete) else {
            return;
        };
        if let Err(e) = self.controller.open_completion(&id) {
            println!("\n{}", e);
            return;
        }

        loop {
            if self.controller.dialog().notes().trim().is_empty() {
                let Some(notes) = self.get_input("Doctor notes (blank to go back)", None) else {
                    break;
                };
                if notes.is_empty() {
                    break;
                }
                self.controller.set_completion_notes(&notes);
            }

            let result = self.controller.submit_completion();
            let succeeded = result.is_ok();
            self.report(result, "Appointment completed");
            if succeeded || !self.controller.dialog().is_open() {
                self.show_schedule();
                return;
            }

            if let Some(banner) = self.controller.error() {
                println!("\n!! {}", banner);
            }
            let retry = self
                .get_input("Retry with the same notes? (y/n)", Some("y"))
                .unwrap_or_default();
            if retry.to_lowercase() != "y" {
                break;
            }
        }
        self.controller.close_completion();
        self.show_schedule();
    }

    fn run(&mut self) {
        self.print_header();
        self.refresh();

        while self.running {
            self.print_menu();

            let Some(choice) = self.get_int_input("Enter choice", Some(1)) else {
                break;
            };

            match choice {
                1 => self.refresh(),
                2 => self.change_filter(),
                3 => {
                    if self.controller.next_page() {
                        self.show_schedule();
                    } else {
                        println!("\nAlready on the last page");
                    }
                }
                4 => {
                    if self.controller.previous_page() {
                        self.show_schedule();
                    } else {
                        println!("\nAlready on the first page");
                    }
                }
                5 => self.go_to_page(),
                6 => self.confirm_appointment(),
                7 => self.cancel_appointment(),
                8 => self.complete_appointment(),
                9 => {
                    self.running = false;
                    println!("\nGoodbye!");
                }
                _ => println!("Invalid choice"),
            }
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let session = SessionContext::from_config(&config);
    let api = match HttpScheduleApi::new(&config, session) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(api_url = api.base_url(), "Using FitBuddy backend");

    let mut cli = ScheduleCLI::new(AppointmentViewController::new(api));
    cli.run();
    ExitCode::SUCCESS
}
