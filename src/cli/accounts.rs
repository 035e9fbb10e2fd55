use std::path::Path;

use comfy_table::{Cell, Table};

use crate::cli::Context;
use crate::error::Result;
use crate::store;

pub fn add(db: Option<&Path>, name: &str, account_type: &str) -> Result<()> {
    let (conn, _) = Context::connect(db)?;
    store::add_account(&conn, name, account_type)?;
    println!("Added account: {name}");
    Ok(())
}

pub fn list(db: Option<&Path>) -> Result<()> {
    let (conn, settings) = Context::connect(db)?;
    let accounts = store::list_accounts(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Type", ""]);
    for account in accounts {
        let marker = if account.name == settings.default_account { "default" } else if account.archived { "archived" } else { "" };
        table.add_row(vec![
            Cell::new(account.id),
            Cell::new(account.name),
            Cell::new(account.account_type),
            Cell::new(marker),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}
