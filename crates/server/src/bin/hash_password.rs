//! Hash a password with the server's argon2 settings, e.g. to seed an
//! account by hand: `hash-password 'mot de passe'`.
use std::process::ExitCode;

fn main() -> ExitCode {
    let Some(password) = std::env::args().nth(1) else {
        eprintln!("usage: hash-password <password>");
        return ExitCode::FAILURE;
    };
    match server::auth::password::hash_password(&password) {
        Ok(hash) => {
            println!("{hash}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("hashing failed: {e}");
            ExitCode::FAILURE
        }
    }
}
