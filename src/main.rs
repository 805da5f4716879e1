use recordcheck::cli::{self, BackendKind, Options};
#[cfg(feature = "solver-z3")]
use recordcheck::smt::Z3Backend;
use recordcheck::smt::{Backend, SmtSolver};
use recordcheck::*;

fn main() {
    env_logger::init();

    let options = Options::from_args();
    let updates = collect_with(&options.tokens, |update| println!("{}", update)).unwrap_or_else(|e| e.exit());
    let record = Record::from_updates(&updates);

    let result = match options.backend {
        BackendKind::Builtin => run(&record, &options, &mut SmtSolver::new()),
        #[cfg(feature = "solver-z3")]
        BackendKind::Z3 => {
            let context = Z3Backend::context();
            run(&record, &options, &mut Z3Backend::new(&context))
        }
    };

    match &result {
        Ok(satisfied) => println!("Satisfied: {}", satisfied),
        Err(e) => eprintln!("error: {}", e),
    }
    std::process::exit(cli::exit_code(&result));
}

fn run(record: &Record, options: &Options, backend: &mut dyn Backend) -> Result<bool, CheckError> {
    let result = check(record, options.strategy, backend);
    if options.dump_smt {
        print!("{}", backend);
    }
    result
}
