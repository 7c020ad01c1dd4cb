// Use the library crate (whose name is defined in Cargo.toml)
use lispy::environment::Environment;
use lispy::evaluator::evaluate;
use lispy::lexer::tokenize;
use lispy::parser::parse_str;

fn main() {
    let input = "(begin (define r 10) (* pi (* r r)))";
    println!("Input:\n  {}", input);

    match tokenize(input) {
        Ok(tokens) => {
            println!("Tokens:");
            for token in &tokens {
                println!("  {:?}", token);
            }
        }
        Err(e) => {
            eprintln!("Lexer Error: {}", e);
            return;
        }
    }

    let node = match parse_str(input) {
        Ok(node) => {
            println!("Parsed:\n  {}", node);
            node
        }
        Err(e) => {
            eprintln!("Parse Error: {}", e);
            return;
        }
    };

    let env = Environment::new_global_populated();
    match evaluate(node, env) {
        Ok(result) => println!("Result:\n  {}", result),
        Err(e) => eprintln!("Evaluation Error: {}", e),
    }
}
