pub mod context;
pub mod identify_commands;

use crate::store::ContactStore;
use context::CLIContext;

/// Run the interactive REPL.
pub fn run(store: &ContactStore) {
    println!("Contact identity reconciliation");
    println!("Type 'help' for commands, 'exit' to quit.");
    println!();

    let ctx = CLIContext::new(store);
    repl_loop(&ctx);
}

fn repl_loop(ctx: &CLIContext) {
    loop {
        let input = match ctx.read_line("> ") {
            Some(s) => s,
            None => break,
        };

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let (command, args) = parse_command(input);

        match command {
            "help" | "?" => print_help(),
            "quit" | "exit" | "q" => break,

            "identify" | "id" => identify_commands::identify(ctx, args),
            "show" => identify_commands::show(ctx, args),
            "delete" => identify_commands::delete(ctx, args),
            "stats" => identify_commands::print_stats(ctx),

            _ => println!("Unknown command: {}. Type 'help' for commands.", command),
        }
    }
}

/// Split input into command and the remaining arguments.
fn parse_command(input: &str) -> (&str, &str) {
    let input = input.trim();
    match input.find(|c: char| c == ' ' || c == '\t') {
        Some(pos) => (&input[..pos], input[pos..].trim()),
        None => (input, ""),
    }
}

fn print_help() {
    println!(r#"
COMMANDS:

  identify email=<e> phone=<p>   Resolve an identity (either field may be omitted)
  identify {{"email": ..., "phoneNumber": ...}}
                                 Resolve from a JSON body
  show <contact-id>              Show the identity a contact belongs to
  delete <contact-id>            Soft-delete a contact
  stats                          Show store statistics
  help                           Show this help
  exit / quit / q                Exit
"#);
}
