//! # Bootstrap
//!
//! Creates the first Owner account in a fresh database, and optionally a
//! demo staff roster with a commission schedule for development.
//!
//! ## Usage
//! ```bash
//! # Owner account only
//! cargo run -p clinic-db --bin seed -- --owner-username owner --owner-pin 246810
//!
//! # Owner plus demo staff and tiers, custom database path
//! cargo run -p clinic-db --bin seed -- --db ./data/clinic.db --owner-pin 246810 --demo
//! ```
//!
//! Nothing is written when the database already has staff accounts.
//! Usage errors (unknown flag, missing value, invalid PIN or username)
//! exit with status 2.

use clinic_core::types::Rate;
use clinic_core::validation::{validate_pin, validate_username};
use clinic_core::{CommissionTier, Money, Role};
use clinic_db::{Database, DbConfig, NewStaff};
use std::env;

/// Demo roster: (username, display name, role). Every demo PIN is 1234.
const DEMO_STAFF: &[(&str, &str, Role)] = &[
    ("manager", "Manager Nok", Role::Manager),
    ("aom", "Aom (Sales)", Role::Sales),
    ("bee", "Bee (BT)", Role::Therapist),
    ("drchai", "Dr. Chai", Role::Doctor),
];

/// Demo commission schedule: (min sales, max sales, percent) in major units.
const DEMO_TIERS: &[(i64, Option<i64>, u32)] = &[
    (0, Some(49_999), 3),
    (50_000, Some(149_999), 5),
    (150_000, None, 8),
];

/// Validated command line.
#[derive(Debug, PartialEq)]
struct SeedArgs {
    db_path: String,
    owner_username: String,
    owner_pin: String,
    demo: bool,
}

#[derive(Debug, PartialEq)]
enum Command {
    Run(SeedArgs),
    Help,
}

fn print_help() {
    println!("Clinic POS Bootstrap");
    println!();
    println!("Usage: seed [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -d, --db <PATH>              Database file path (default: $CLINIC_DB_PATH or ./clinic.db)");
    println!("  -u, --owner-username <NAME>  Owner login (default: owner)");
    println!("  -p, --owner-pin <PIN>        Owner PIN, 4-12 digits (required)");
    println!("      --demo                   Also create demo staff and commission tiers");
    println!("  -h, --help                   Show this help message");
}

/// Parses and validates arguments (without the program name).
/// Every error is a usage error.
fn parse_args(args: &[String], default_db: String) -> Result<Command, String> {
    let mut db_path = default_db;
    let mut owner_username = String::from("owner");
    let mut owner_pin: Option<String> = None;
    let mut demo = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} requires a value", flag))
        };
        match arg.as_str() {
            "--db" | "-d" => db_path = value("--db")?,
            "--owner-username" | "-u" => owner_username = value("--owner-username")?,
            "--owner-pin" | "-p" => owner_pin = Some(value("--owner-pin")?),
            "--demo" => demo = true,
            "--help" | "-h" => return Ok(Command::Help),
            other => return Err(format!("Unknown argument: {}", other)),
        }
    }

    let owner_pin = owner_pin.ok_or_else(|| String::from("--owner-pin is required"))?;
    let owner_username = validate_username(&owner_username).map_err(|e| e.to_string())?;
    validate_pin(&owner_pin).map_err(|e| e.to_string())?;

    Ok(Command::Run(SeedArgs {
        db_path,
        owner_username,
        owner_pin,
        demo,
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().skip(1).collect();
    let default_db = env::var("CLINIC_DB_PATH").unwrap_or_else(|_| String::from("./clinic.db"));

    let SeedArgs {
        db_path,
        owner_username,
        owner_pin,
        demo,
    } = match parse_args(&args, default_db) {
        Ok(Command::Run(args)) => args,
        Ok(Command::Help) => {
            print_help();
            return Ok(());
        }
        Err(message) => {
            eprintln!("{} (see --help)", message);
            std::process::exit(2);
        }
    };

    println!("Clinic POS Bootstrap");
    println!("====================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.users().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} staff accounts", existing);
        println!("  Skipping bootstrap.");
        return Ok(());
    }

    let owner = db
        .users()
        .create(&NewStaff {
            username: owner_username.clone(),
            pin: owner_pin,
            display_name: String::from("Owner"),
            role: Role::Owner,
        })
        .await?;
    println!("✓ Created owner '{}' (id {})", owner.username, owner.id);

    if demo {
        for (username, display_name, role) in DEMO_STAFF {
            let staff = db
                .users()
                .create(&NewStaff {
                    username: username.to_string(),
                    pin: String::from("1234"),
                    display_name: display_name.to_string(),
                    role: *role,
                })
                .await?;
            println!("  + {} [{}]", staff.display_name, staff.role);
        }

        let tiers: Vec<CommissionTier> = DEMO_TIERS
            .iter()
            .map(|(min, max, percent)| CommissionTier {
                id: 0,
                min_sales: Money::from_major(*min),
                max_sales: max.map(Money::from_major),
                percent: Rate::from_percent(*percent),
            })
            .collect();
        let saved = db.commission_tiers().replace_all(&tiers).await?;
        println!("✓ Saved {} commission tiers", saved.len());
    }

    db.close().await;
    println!();
    println!("Done.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, String> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        parse_args(&args, String::from("./clinic.db"))
    }

    #[test]
    fn test_parse_full_command_line() {
        let command = parse(&["-d", "/tmp/c.db", "-u", "boss", "-p", "246810", "--demo"]).unwrap();
        assert_eq!(
            command,
            Command::Run(SeedArgs {
                db_path: String::from("/tmp/c.db"),
                owner_username: String::from("boss"),
                owner_pin: String::from("246810"),
                demo: true,
            })
        );
        assert_eq!(parse(&["--help"]).unwrap(), Command::Help);
    }

    #[test]
    fn test_usage_errors() {
        assert_eq!(parse(&[]).unwrap_err(), "--owner-pin is required");
        assert_eq!(parse(&["-p", "1234", "--force"]).unwrap_err(), "Unknown argument: --force");
        assert_eq!(parse(&["-p", "1234", "--db"]).unwrap_err(), "--db requires a value");
        assert!(parse(&["-p", "12"]).unwrap_err().starts_with("pin"));
        assert!(parse(&["-p", "1234", "-u", "has space"]).unwrap_err().starts_with("username"));
    }
}
