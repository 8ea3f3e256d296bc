use davgate_service::auth::password::{hash_password, hash_password_bcrypt};

const BCRYPT_COST: u32 = 12;

fn main() {
    let mut args = std::env::args().skip(1).peekable();
    let use_bcrypt = args.next_if(|arg| arg == "--bcrypt").is_some();
    let password = args.next().unwrap_or_else(|| "password".to_string());

    let hashed = if use_bcrypt {
        hash_password_bcrypt(&password, BCRYPT_COST)
    } else {
        hash_password(&password)
    };

    match hashed {
        Ok(hash) => {
            println!("{hash}");
        }
        Err(err) => {
            eprintln!("Failed to hash password: {err}");
            std::process::exit(1);
        }
    }
}
