use std::io::{self, Write};

use chrono::NaiveDateTime;
use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use inventory_api::models::UserInput;
use inventory_api::orm::login::hash_password;
use inventory_api::orm::user::{get_user_by_username, insert_user, list_users, set_password_hash};
use regex::Regex;
use rpassword::read_password;

#[derive(Subcommand)]
pub enum UserAction {
    #[command(about = "Add a new login user")]
    Add {
        #[arg(short, long, help = "Username used to log in")]
        username: String,
        #[arg(short, long, default_value = "", help = "Email address")]
        email: String,
        #[arg(long = "first-name", default_value = "", help = "First name")]
        first_name: String,
        #[arg(long = "last-name", default_value = "", help = "Last name")]
        last_name: String,
        #[arg(short, long, help = "Password (will be prompted securely if not provided)")]
        password: Option<String>,
    },
    #[command(about = "Change a user's password")]
    Passwd {
        #[arg(short, long, help = "Username")]
        username: String,
        #[arg(short, long, help = "New password (will be prompted securely if not provided)")]
        password: Option<String>,
    },
    #[command(about = "List users, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(
            short = 'F',
            long = "fixed-string",
            help = "Treat search term as fixed string instead of regex"
        )]
        fixed_string: bool,
    },
}

pub fn handle_user_command_with_conn(
    conn: &mut SqliteConnection,
    action: UserAction,
    now: NaiveDateTime,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        UserAction::Add { username, email, first_name, last_name, password } => {
            let password = match password {
                Some(p) => p,
                None => prompt_for_password()?,
            };
            let input = UserInput {
                username,
                email,
                first_name,
                last_name,
                password_hash: hash_password(&password)?,
            };
            let user = insert_user(conn, input, now)?;
            println!("User created successfully!");
            println!("ID: {}", user.id);
            println!("Username: {}", user.username);
        }
        UserAction::Passwd { username, password } => {
            change_password_impl(conn, &username, password, now)?;
        }
        UserAction::Ls { search_term, fixed_string } => {
            for line in list_users_impl(conn, search_term.as_deref(), fixed_string)? {
                println!("{}", line);
            }
        }
    }
    Ok(())
}

pub fn change_password_impl(
    conn: &mut SqliteConnection,
    username: &str,
    password: Option<String>,
    now: NaiveDateTime,
) -> Result<(), Box<dyn std::error::Error>> {
    let user = get_user_by_username(conn, username)?
        .ok_or_else(|| format!("User '{}' not found", username))?;
    let password = match password {
        Some(p) => p,
        None => prompt_for_password()?,
    };
    set_password_hash(conn, user.id, &hash_password(&password)?, now)?;
    println!("Password changed successfully for user: {}", username);
    Ok(())
}

pub fn list_users_impl(
    conn: &mut SqliteConnection,
    search_term: Option<&str>,
    fixed_string: bool,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let users = list_users(conn)?;
    let users = match search_term {
        None => users,
        Some(term) if fixed_string => {
            users.into_iter().filter(|u| u.username.contains(term)).collect()
        }
        Some(term) => {
            let regex = Regex::new(term)
                .map_err(|e| format!("Invalid regex pattern '{}': {}", term, e))?;
            users.into_iter().filter(|u| regex.is_match(&u.username)).collect()
        }
    };
    if users.is_empty() {
        return Ok(vec!["No users found.".to_string()]);
    }
    let mut lines = vec!["Users:".to_string()];
    lines.extend(users.iter().map(|u| {
        format!(
            "  ID: {}, Username: {}, Email: {}, Created: {}",
            u.id, u.username, u.email, u.created_at
        )
    }));
    Ok(lines)
}

pub fn prompt_for_password() -> Result<String, Box<dyn std::error::Error>> {
    print!("Enter new password: ");
    io::stdout().flush()?;
    let password = read_password()?;

    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }

    print!("Confirm new password: ");
    io::stdout().flush()?;
    let confirm_password = read_password()?;

    if password != confirm_password {
        return Err("Passwords do not match".into());
    }

    Ok(password)
}
