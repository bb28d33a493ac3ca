// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version, value_parser};

fn json_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print as pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn scope_arg() -> Arg {
    Arg::new("scope")
        .long("scope")
        .default_value("single")
        .help("single | all | future | past")
}

fn field_args(cmd: Command, expense: bool, required: bool) -> Command {
    let mut cmd = cmd
        .arg(Arg::new("amount").long("amount").required(required))
        .arg(Arg::new("description").long("description").required(required))
        .arg(Arg::new("category").long("category").required(required))
        .arg(
            Arg::new("subcategory")
                .long("subcategory")
                .help("Subcategory name under --category"),
        )
        .arg(Arg::new("bank").long("bank"));
    if expense {
        cmd = cmd
            .arg(
                Arg::new("method")
                    .long("method")
                    .help("card | pix | cash | debit | transfer"),
            )
            .arg(Arg::new("card").long("card").help("Credit card name"));
    }
    cmd
}

fn transaction_cmd(name: &'static str, expense: bool) -> Command {
    let mut add = field_args(
        Command::new("add").about(format!("Record a new {}", name)),
        expense,
        true,
    )
    .arg(Arg::new("date").long("date").required(true).help("YYYY-MM-DD"))
    .arg(
        Arg::new("recurring")
            .long("recurring")
            .action(ArgAction::SetTrue)
            .help("Repeat monthly from --date"),
    )
    .arg(
        Arg::new("until")
            .long("until")
            .requires("recurring")
            .help("Last date of a recurring series (YYYY-MM-DD)"),
    );
    if expense {
        add = add.arg(
            Arg::new("installments")
                .long("installments")
                .value_parser(value_parser!(u32))
                .conflicts_with("recurring")
                .help("Split into N monthly installments"),
        );
    }

    let list = json_args(
        Command::new("list")
            .about(format!("List {} records", name))
            .arg(
                Arg::new("month")
                    .long("month")
                    .action(ArgAction::Append)
                    .value_parser(value_parser!(u32).range(1..=12)),
            )
            .arg(
                Arg::new("year")
                    .long("year")
                    .action(ArgAction::Append)
                    .value_parser(value_parser!(i32)),
            )
            .arg(Arg::new("category").long("category"))
            .arg(Arg::new("description").long("description"))
            .arg(
                Arg::new("recurring")
                    .long("recurring")
                    .value_parser(value_parser!(bool)),
            )
            .arg(
                Arg::new("limit")
                    .long("limit")
                    .value_parser(value_parser!(usize)),
            ),
    );

    let series = json_args(Command::new("series").about("One row per recurring or installment series"));

    let show = json_args(
        Command::new("show")
            .about("Show a record and the rest of its series")
            .arg(
                Arg::new("id")
                    .long("id")
                    .required(true)
                    .value_parser(value_parser!(i64)),
            ),
    );

    let edit = field_args(
        Command::new("edit").about("Edit a record, optionally across its series"),
        expense,
        false,
    )
    .arg(
        Arg::new("id")
            .long("id")
            .required(true)
            .value_parser(value_parser!(i64)),
    )
    .arg(scope_arg());

    let rm = Command::new("rm")
        .about("Delete a record, optionally across its series")
        .arg(
            Arg::new("id")
                .long("id")
                .required(true)
                .value_parser(value_parser!(i64)),
        )
        .arg(scope_arg());

    let extend = Command::new("extend")
        .about("Add occurrences to a recurring series")
        .arg(Arg::new("group").long("group").required(true))
        .arg(Arg::new("until").long("until").required(true).help("YYYY-MM-DD"));

    Command::new(name)
        .about(format!("Manage {} records", name))
        .subcommand(add)
        .subcommand(list)
        .subcommand(series)
        .subcommand(show)
        .subcommand(edit)
        .subcommand(rm)
        .subcommand(extend)
}

pub fn build_cli() -> Command {
    Command::new("spendwise")
        .version(crate_version!())
        .about("Track expenses and incomes, including recurring and installment series")
        .arg(
            Arg::new("user")
                .long("user")
                .global(true)
                .default_value("1")
                .value_parser(value_parser!(i64))
                .help("Owner of the records to operate on"),
        )
        .subcommand(Command::new("init").about("Create the database"))
        .subcommand(transaction_cmd("expense", true))
        .subcommand(transaction_cmd("income", false))
        .subcommand(
            json_args(
                Command::new("schedule")
                    .about("Preview the monthly occurrence dates of a series")
                    .arg(Arg::new("start").long("start").required(true))
                    .arg(
                        Arg::new("count")
                            .long("count")
                            .value_parser(value_parser!(u32))
                            .conflicts_with("until"),
                    )
                    .arg(Arg::new("until").long("until"))
                    .arg(
                        Arg::new("limit")
                            .long("limit")
                            .default_value("120")
                            .value_parser(value_parser!(usize)),
                    ),
            ),
        )
        .subcommand(
            Command::new("category")
                .about("Manage categories and subcategories")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("parent").long("parent")),
                )
                .subcommand(json_args(Command::new("list")))
                .subcommand(
                    Command::new("rm")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("parent").long("parent")),
                ),
        )
        .subcommand(
            Command::new("bank")
                .about("Manage banks")
                .subcommand(Command::new("add").arg(Arg::new("name").long("name").required(true)))
                .subcommand(json_args(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true))),
        )
        .subcommand(
            Command::new("card")
                .about("Manage credit cards")
                .subcommand(
                    Command::new("add")
                        .arg(Arg::new("name").long("name").required(true))
                        .arg(Arg::new("bank").long("bank")),
                )
                .subcommand(json_args(Command::new("list")))
                .subcommand(Command::new("rm").arg(Arg::new("name").long("name").required(true))),
        )
        .subcommand(
            Command::new("report")
                .about("Totals by month or category")
                .subcommand(json_args(
                    Command::new("monthly")
                        .arg(
                            Arg::new("year")
                                .long("year")
                                .required(true)
                                .value_parser(value_parser!(i32)),
                        ),
                ))
                .subcommand(json_args(
                    Command::new("category")
                        .arg(Arg::new("month").long("month").required(true).help("YYYY-MM")),
                )),
        )
        .subcommand(
            Command::new("export")
                .about("Export records")
                .subcommand(
                    Command::new("transactions")
                        .arg(
                            Arg::new("kind")
                                .long("kind")
                                .default_value("expense")
                                .help("expense | income"),
                        )
                        .arg(Arg::new("format").long("format").default_value("json"))
                        .arg(Arg::new("out").long("out").required(true)),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Import records from a versioned JSON file")
                .subcommand(
                    Command::new("transactions")
                        .arg(Arg::new("path").long("path").required(true)),
                ),
        )
        .subcommand(Command::new("doctor").about("Check series integrity"))
        .subcommand(
            Command::new("config")
                .about("Show or change settings")
                .subcommand(Command::new("show"))
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("key").long("key").required(true))
                        .arg(Arg::new("value").long("value").required(true)),
                ),
        )
}
