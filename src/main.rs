use clap::Parser;

use runway::cli::{
    self, AccountsCommands, BalanceCommands, Cli, Commands, IrregularCommands, RecurringCommands,
    TxnCommands,
};

fn main() {
    runway::init_tracing();
    let cli = Cli::parse();
    let db = cli.db.as_deref();
    let account = cli.account.as_deref();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(db, data_dir),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add { name, account_type } => cli::accounts::add(db, &name, &account_type),
            AccountsCommands::List => cli::accounts::list(db),
        },
        Commands::Txn { command } => match command {
            TxnCommands::Add {
                description,
                amount,
                date,
            } => cli::transactions::add(db, account, &description, amount, date.as_deref()),
            TxnCommands::List { from_date, to_date } => {
                cli::transactions::list(db, account, from_date.as_deref(), to_date.as_deref())
            }
            TxnCommands::Delete { id } => cli::transactions::delete(db, account, id),
        },
        Commands::Recurring { command } => match command {
            RecurringCommands::Add {
                description,
                amount,
                start,
                frequency,
                income,
            } => cli::recurring::add(db, account, &description, amount, &start, &frequency, income),
            RecurringCommands::List => cli::recurring::list(db, account),
            RecurringCommands::Delete { id } => cli::recurring::delete(db, account, id),
        },
        Commands::Balance { command } => match command {
            BalanceCommands::Set { amount, at } => cli::balance::set(db, account, amount, at.as_deref()),
            BalanceCommands::Show => cli::balance::show(db, account),
        },
        Commands::Irregular { command } => match command {
            IrregularCommands::Category {
                name,
                window_days,
                alpha,
            } => cli::irregular::category(db, account, &name, window_days, alpha),
            IrregularCommands::Rule { category, pattern } => {
                cli::irregular::rule(db, account, &category, &pattern)
            }
            IrregularCommands::List => cli::irregular::list(db, account),
            IrregularCommands::Learn {
                category,
                from_date,
                to_date,
            } => cli::irregular::learn(db, account, &category, from_date.as_deref(), to_date.as_deref()),
            IrregularCommands::Forecast {
                category,
                from_date,
                to_date,
                mode,
                paths,
                seed,
            } => cli::irregular::forecast(
                db,
                account,
                &category,
                from_date.as_deref(),
                to_date.as_deref(),
                mode,
                paths,
                seed,
            ),
        },
        Commands::Ledger {
            from_date,
            limit,
            mode,
            seed,
        } => cli::ledger::run(db, account, from_date.as_deref(), limit, mode, seed),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
