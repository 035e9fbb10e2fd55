use std::path::{Path, PathBuf};

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings};

/// With `--db`, initializes that file and leaves settings alone.
pub fn run(db: Option<&Path>, data_dir: Option<String>) -> Result<()> {
    let db_path = match db {
        Some(path) => path.to_path_buf(),
        None => {
            let mut settings = load_settings();
            if let Some(dir) = data_dir {
                settings.data_dir = dir;
            }
            save_settings(&settings)?;
            settings.db_path()
        }
    };

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    println!("Database ready at {}", display(&db_path));
    Ok(())
}

fn display(path: &Path) -> String {
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .display()
        .to_string()
}
