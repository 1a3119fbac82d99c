use crate::calculator::format_number;
use crate::history::CalculationRecord;
#[cfg(feature = "web")]
use std::error::Error;

const CSV_HEADER: [&str; 5] = ["created_at", "operand1", "operation", "operand2", "result"];

/// Convert calculation history to CSV format
///
/// One row per record, in the order given, under a fixed header row.
/// Timestamps are RFC 3339 in UTC.
///
/// # Arguments
/// * `records` - History records to export
///
/// # Returns
/// * `String` - CSV content
pub fn to_csv(records: &[CalculationRecord]) -> String {
    let mut csv_content = CSV_HEADER.join(",");
    csv_content.push('\n');

    for record in records {
        let row = [
            record.created_at.to_rfc3339(),
            format_number(record.operand1),
            record.operation.name().to_string(),
            format_number(record.operand2),
            format_number(record.result),
        ];
        csv_content.push_str(&row.join(","));
        csv_content.push('\n');
    }

    csv_content
}

/// Convert calculation history to XLSX format
///
/// Same columns as [`to_csv`]; numbers are written as numeric cells.
///
/// # Arguments
/// * `records` - History records to export
///
/// # Returns
/// * `Result<Vec<u8>, Box<dyn Error>>` - XLSX file content as bytes or an error
#[cfg(feature = "web")]
pub fn to_xlsx(records: &[CalculationRecord]) -> Result<Vec<u8>, Box<dyn Error>> {
    use rust_xlsxwriter::{Workbook, Worksheet};

    let mut workbook = Workbook::new();
    let mut worksheet = Worksheet::new();

    for (col, title) in CSV_HEADER.iter().enumerate() {
        worksheet.write_string(0, col as u16, *title)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_string(row, 0, &record.created_at.to_rfc3339())?;
        worksheet.write_number(row, 1, record.operand1)?;
        worksheet.write_string(row, 2, record.operation.name())?;
        worksheet.write_number(row, 3, record.operand2)?;
        worksheet.write_number(row, 4, record.result)?;
    }

    workbook.push_worksheet(worksheet);

    let buffer = workbook.save_to_buffer()?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculator::{OperationTag, UserReference};

    #[test]
    fn test_to_csv() {
        let user = UserReference::new("alice");
        let records = vec![
            CalculationRecord::new(&user, 10.0, 4.0, OperationTag::Divide, 2.5),
            CalculationRecord::new(&user, -1.5, 2.0, OperationTag::Multiply, -3.0),
        ];

        let csv = to_csv(&records);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "created_at,operand1,operation,operand2,result");
        assert!(lines[1].ends_with(",10,divide,4,2.5"));
        assert!(lines[2].ends_with(",-1.5,multiply,2,-3"));
    }

    #[test]
    fn test_to_csv_extreme_values_stay_short() {
        let user = UserReference::new("alice");
        let records = vec![CalculationRecord::new(&user, 1e308, 1e-300, OperationTag::Add, 1e308)];

        let csv = to_csv(&records);
        assert!(csv.lines().nth(1).unwrap().ends_with(",1e308,add,1e-300,1e308"));
    }

    #[test]
    fn test_to_csv_empty() {
        assert_eq!(to_csv(&[]), "created_at,operand1,operation,operand2,result\n");
    }

    #[cfg(feature = "web")]
    #[test]
    fn test_to_xlsx_produces_zip() {
        let user = UserReference::new("alice");
        let records = vec![CalculationRecord::new(&user, 1.0, 2.0, OperationTag::Add, 3.0)];

        let bytes = to_xlsx(&records).unwrap();
        // XLSX is a zip container
        assert_eq!(&bytes[..2], b"PK");
    }
}
