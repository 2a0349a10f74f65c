use std::{env, fs, path::Path, process::ExitCode};

mod runner;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let Ok(db_path) = env::var("DATABASE_PATH") else {
        eprintln!("DATABASE_PATH must be set");
        return ExitCode::FAILURE;
    };
    let url = format!("sqlite://{}?mode=rwc", db_path);
    let args: Vec<String> = env::args().collect();

    let result = match args.get(1).map(|s| s.as_str()) {
        Some("clean") => remove_db_file(&db_path),
        Some("fresh") => match remove_db_file(&db_path).and_then(|_| create_db_dir(&db_path)) {
            Ok(()) => runner::run_all_migrations(&url).await,
            Err(e) => Err(e),
        },
        _ => match create_db_dir(&db_path) {
            Ok(()) => runner::run_all_migrations(&url).await,
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn remove_db_file(path: &str) -> Result<(), String> {
    let db_path = Path::new(path);
    if db_path.exists() {
        fs::remove_file(db_path).map_err(|e| format!("Failed to delete DB file: {e}"))?;
        println!("Deleted DB: {}", db_path.display());
    } else {
        println!("DB file does not exist: {}", db_path.display());
    }

    // Module settings and extracted content live beside the database.
    if let Ok(storage_root) = env::var("STORAGE_ROOT") {
        let storage_path = Path::new(&storage_root);
        if storage_path.exists() {
            fs::remove_dir_all(storage_path)
                .map_err(|e| format!("Failed to delete plagiarism storage: {e}"))?;
            println!("Deleted plagiarism storage: {}", storage_path.display());
        } else {
            println!("Plagiarism storage does not exist: {}", storage_path.display());
        }
    }

    Ok(())
}

fn create_db_dir(path: &str) -> Result<(), String> {
    if let Some(parent) = Path::new(path).parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create DB directory: {e}"))?;
    }
    Ok(())
}
