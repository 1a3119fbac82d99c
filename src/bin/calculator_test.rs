use calcsite::calculator::{CalculationRequest, CalculationResult, ErrorKind, evaluate};
use calcsite::history::{HistoryStore, MemoryHistoryStore};
use calcsite::UserReference;

// Helper function to check a successful calculation
fn assert_value(a: &str, b: &str, op: &str, expected: f64) {
    let result = calcsite::compute(&CalculationRequest::new(a, b, op));
    match result {
        CalculationResult::Success { value, .. } => {
            assert!(
                (value - expected).abs() < 1e-9,
                "{} {} {} gave {}, expected {}",
                a,
                op,
                b,
                value,
                expected
            );
            println!("✓ {} {} {} = {}", a, op, b, value);
        }
        other => panic!("{} {} {} failed: {:?}", a, op, b, other),
    }
}

// Helper function to check a rejected calculation
fn assert_error(a: &str, b: &str, op: &str, expected: ErrorKind) {
    let result = calcsite::compute(&CalculationRequest::new(a, b, op));
    assert_eq!(result.error_kind(), Some(&expected));
    println!("✓ {:?} {:?} {:?} rejected: {}", a, op, b, expected);
}

fn test_operations() {
    println!("\n====== Testing operations ======");
    assert_value("2", "3", "add", 5.0);
    assert_value("2", "3", "subtract", -1.0);
    assert_value("2.5", "4", "multiply", 10.0);
    assert_value("10", "4", "divide", 2.5);
    assert_value("-7", "2", "divide", -3.5);
}

fn test_errors() {
    println!("\n====== Testing errors ======");
    assert_error("abc", "1", "add", ErrorKind::InvalidInput);
    assert_error("1.2.3", "1", "add", ErrorKind::InvalidInput);
    assert_error("", "1", "add", ErrorKind::InvalidInput);
    assert_error("1", "2", "power", ErrorKind::InvalidOperation);
    assert_error("1", "2", "", ErrorKind::InvalidOperation);
    assert_error("10", "0", "divide", ErrorKind::DivisionByZero);
    assert_error(
        "1e308",
        "10",
        "multiply",
        ErrorKind::ComputationError("result is not a finite number".to_string()),
    );
}

fn test_history_hook() {
    println!("\n====== Testing history hook ======");
    let store = MemoryHistoryStore::new();
    let user = UserReference::new("smoke");

    evaluate(&CalculationRequest::new("10", "3", "divide"), Some(&user), &store);
    evaluate(&CalculationRequest::new("10", "3", "divide"), None, &store);
    evaluate(&CalculationRequest::new("10", "0", "divide"), Some(&user), &store);

    let records = store.list("smoke").unwrap();
    assert_eq!(records.len(), 1);
    println!("✓ Only the signed-in success was recorded: {}", records[0]);
}

pub fn run_tests() {
    println!("Starting calculator smoke tests");
    test_operations();
    test_errors();
    test_history_hook();
    println!("All tests passed!");
}

fn main() {
    run_tests();
}
