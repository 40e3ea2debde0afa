//! Address table input/output: CSV files or Excel workbooks.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Reader};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use rust_xlsxwriter::{Workbook, Worksheet};
use thiserror::Error;
use tracing::{info, warn};

use crate::batch::RowOutcome;

/// Header names that mark an address column (case-insensitive substring match)
pub const ADDRESS_COLUMN_HINTS: &[&str] = &[
    "address",
    "street address",
    "property address",
    "full address",
    "location",
];

/// Columns appended to the output table
pub const OUTPUT_COLUMNS: [&str; 4] = ["Latitude", "Longitude", "On_Tribal_Land", "Tribal_Area"];

const OUTPUT_SUFFIX: &str = "_tribal_checked";

#[derive(Debug, Error)]
pub enum TableError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("workbook write error: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),
    #[error("sheet '{0}' not found; available sheets: {1}")]
    UnknownSheet(String, String),
    #[error("workbook has no sheets")]
    NoSheets,
    #[error("table too large for a worksheet ({0})")]
    TooLarge(String),
    #[error("column '{0}' not found; available columns: {1}")]
    UnknownColumn(String, String),
    #[error("column index {0} out of range ({1} columns)")]
    ColumnOutOfRange(usize, usize),
    #[error("row count mismatch: {rows} rows but {outcomes} outcomes")]
    RowMismatch { rows: usize, outcomes: usize },
}

/// File layout, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    /// `.xlsx`, `.xlsm`, `.xlsb`, `.xls` or `.ods`; always written back as `.xlsx`
    Spreadsheet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => TableFormat::Spreadsheet,
            _ => TableFormat::Csv,
        }
    }

    fn output_extension(self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Spreadsheet => "xlsx",
        }
    }
}

/// An input table: header row plus data rows, kept verbatim for output.
#[derive(Debug, Clone)]
pub struct AddressTable {
    pub headers: StringRecord,
    pub rows: Vec<StringRecord>,
    /// Worksheet the rows came from, reused as the output sheet name
    pub sheet: Option<String>,
}

impl AddressTable {
    /// Read a CSV or workbook depending on the file extension.
    ///
    /// `sheet` is a sheet name or zero-based index; the first sheet is used
    /// when it is `None`. CSV input ignores it.
    pub fn read<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> Result<Self, TableError> {
        let path = path.as_ref();
        match TableFormat::from_path(path) {
            TableFormat::Csv => {
                if let Some(sheet) = sheet {
                    warn!("Ignoring sheet '{}' for CSV input", sheet);
                }
                Self::read_csv(path)
            }
            TableFormat::Spreadsheet => Self::read_spreadsheet(path, sheet),
        }
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        info!("Reading table: {}", path.display());

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        let headers = reader.headers()?.clone();
        let rows = reader.records().collect::<Result<Vec<_>, _>>()?;

        info!("Loaded {} rows", rows.len());
        Ok(Self {
            headers,
            rows,
            sheet: None,
        })
    }

    pub fn read_spreadsheet<P: AsRef<Path>>(
        path: P,
        sheet: Option<&str>,
    ) -> Result<Self, TableError> {
        let path = path.as_ref();
        info!("Reading workbook: {}", path.display());

        let mut workbook = open_workbook_auto(path)?;
        let sheet = select_sheet(&workbook.sheet_names(), sheet)?;
        let range = workbook.worksheet_range(&sheet)?;

        let mut records = range.rows().map(|cells| {
            StringRecord::from(cells.iter().map(|c| c.to_string()).collect::<Vec<_>>())
        });
        let headers = records.next().unwrap_or_default();
        let rows: Vec<StringRecord> = records.collect();

        info!("Loaded {} rows from sheet '{}'", rows.len(), sheet);
        Ok(Self {
            headers,
            rows,
            sheet: Some(sheet),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.headers.iter().collect()
    }

    /// First column whose header contains one of the address hints.
    pub fn detect_address_column(&self) -> Option<usize> {
        self.headers.iter().position(|h| {
            let h = h.to_lowercase();
            ADDRESS_COLUMN_HINTS.iter().any(|hint| h.contains(hint))
        })
    }

    /// Exact (then case-insensitive) header lookup.
    pub fn column_by_name(&self, name: &str) -> Result<usize, TableError> {
        self.headers
            .iter()
            .position(|h| h == name)
            .or_else(|| self.headers.iter().position(|h| h.eq_ignore_ascii_case(name)))
            .ok_or_else(|| {
                TableError::UnknownColumn(name.to_string(), self.column_names().join(", "))
            })
    }

    pub fn check_column(&self, index: usize) -> Result<usize, TableError> {
        if index < self.headers.len() {
            Ok(index)
        } else {
            Err(TableError::ColumnOutOfRange(index, self.headers.len()))
        }
    }

    /// Address cells for a column; missing cells come back as `None`.
    pub fn addresses(&self, column: usize) -> Vec<Option<&str>> {
        self.rows.iter().map(|r| r.get(column)).collect()
    }

    /// Write the table with the result columns appended, in the format the
    /// output extension names.
    pub fn write<P: AsRef<Path>>(&self, path: P, outcomes: &[RowOutcome]) -> Result<(), TableError> {
        match TableFormat::from_path(path.as_ref()) {
            TableFormat::Csv => self.write_csv(path, outcomes),
            TableFormat::Spreadsheet => self.write_xlsx(path, outcomes),
        }
    }

    pub fn write_csv<P: AsRef<Path>>(
        &self,
        path: P,
        outcomes: &[RowOutcome],
    ) -> Result<(), TableError> {
        self.check_outcomes(outcomes)?;

        let mut writer = WriterBuilder::new().flexible(true).from_path(path.as_ref())?;
        writer.write_record(&self.output_header())?;

        for (row, outcome) in self.rows.iter().zip(outcomes) {
            let mut record = self.fit_to_header(row);
            let (lat, lon) = match outcome.coordinate {
                Some(c) => (c.lat.to_string(), c.lon.to_string()),
                None => (String::new(), String::new()),
            };
            record.push_field(&lat);
            record.push_field(&lon);
            record.push_field(outcome.classification.label());
            record.push_field(outcome.area.as_deref().unwrap_or(""));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        info!("Results saved to: {}", path.as_ref().display());
        Ok(())
    }

    /// Write an `.xlsx` workbook; coordinates are stored as numbers.
    pub fn write_xlsx<P: AsRef<Path>>(
        &self,
        path: P,
        outcomes: &[RowOutcome],
    ) -> Result<(), TableError> {
        self.check_outcomes(outcomes)?;

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        if let Some(name) = &self.sheet {
            worksheet.set_name(name.as_str())?;
        }

        write_text_row(worksheet, 0, &self.output_header())?;

        let width = self.headers.len();
        let lat_col = cell_col(width)?;
        for (idx, (row, outcome)) in self.rows.iter().zip(outcomes).enumerate() {
            let row_num = cell_row(idx + 1)?;
            write_text_row(worksheet, row_num, &self.fit_to_header(row))?;

            if let Some(c) = outcome.coordinate {
                worksheet.write_number(row_num, lat_col, c.lat)?;
                worksheet.write_number(row_num, lat_col + 1, c.lon)?;
            }
            worksheet.write_string(row_num, lat_col + 2, outcome.classification.label())?;
            if let Some(area) = &outcome.area {
                worksheet.write_string(row_num, lat_col + 3, area.as_str())?;
            }
        }

        workbook.save(path.as_ref())?;
        info!("Results saved to: {}", path.as_ref().display());
        Ok(())
    }

    fn check_outcomes(&self, outcomes: &[RowOutcome]) -> Result<(), TableError> {
        if outcomes.len() != self.rows.len() {
            return Err(TableError::RowMismatch {
                rows: self.rows.len(),
                outcomes: outcomes.len(),
            });
        }

        let width = self.headers.len();
        let overlong = self.rows.iter().filter(|r| r.len() > width).count();
        if overlong > 0 {
            warn!(
                "{} rows have more fields than the {} header columns; extra fields are dropped",
                overlong, width
            );
        }
        Ok(())
    }

    fn output_header(&self) -> StringRecord {
        let mut header = self.headers.clone();
        for column in OUTPUT_COLUMNS {
            header.push_field(column);
        }
        header
    }

    /// Row cut or padded to the header width, so the result columns always
    /// line up under their headers.
    fn fit_to_header(&self, row: &StringRecord) -> StringRecord {
        let width = self.headers.len();
        let mut record = row.clone();
        record.truncate(width);
        while record.len() < width {
            record.push_field("");
        }
        record
    }
}

fn select_sheet(names: &[String], wanted: Option<&str>) -> Result<String, TableError> {
    let Some(wanted) = wanted else {
        return names.first().cloned().ok_or(TableError::NoSheets);
    };

    if let Some(name) = names.iter().find(|n| n.as_str() == wanted) {
        return Ok(name.clone());
    }
    wanted
        .parse::<usize>()
        .ok()
        .and_then(|i| names.get(i))
        .cloned()
        .ok_or_else(|| TableError::UnknownSheet(wanted.to_string(), names.join(", ")))
}

fn write_text_row(worksheet: &mut Worksheet, row: u32, record: &StringRecord) -> Result<(), TableError> {
    for (col, field) in record.iter().enumerate() {
        if !field.is_empty() {
            worksheet.write_string(row, cell_col(col)?, field)?;
        }
    }
    Ok(())
}

fn cell_row(row: usize) -> Result<u32, TableError> {
    u32::try_from(row).map_err(|_| TableError::TooLarge(format!("row {}", row)))
}

fn cell_col(col: usize) -> Result<u16, TableError> {
    u16::try_from(col).map_err(|_| TableError::TooLarge(format!("column {}", col)))
}

/// `<dir>/<stem>_tribal_checked.<csv|xlsx>` next to the input.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("addresses");
    let ext = TableFormat::from_path(input).output_extension();
    input.with_file_name(format!("{}{}.{}", stem, OUTPUT_SUFFIX, ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, Coordinate};
    use std::io::Write;

    fn table_from(contents: &str) -> (tempfile::NamedTempFile, AddressTable) {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let table = AddressTable::read_csv(file.path()).unwrap();
        (file, table)
    }

    fn workbook_from(sheets: &[(&str, &[&[&str]])]) -> tempfile::NamedTempFile {
        let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        let mut workbook = Workbook::new();
        for (name, rows) in sheets {
            let worksheet = workbook.add_worksheet();
            worksheet.set_name(*name).unwrap();
            for (r, row) in rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    worksheet.write_string(r as u32, c as u16, *cell).unwrap();
                }
            }
        }
        workbook.save(file.path()).unwrap();
        file
    }

    fn window_rock() -> RowOutcome {
        RowOutcome {
            classification: Classification::OnTribalLand,
            coordinate: Some(Coordinate::new(35.5, -109.25).unwrap()),
            area: Some("Navajo Nation".to_string()),
        }
    }

    fn no_data() -> RowOutcome {
        RowOutcome {
            classification: Classification::NoAddressData,
            coordinate: None,
            area: None,
        }
    }

    #[test]
    fn test_detect_address_column() {
        let (_f, table) = table_from("Owner,Property Address,Value\nA,1 Main St,10\n");
        assert_eq!(table.detect_address_column(), Some(1));

        let (_f, table) = table_from("id,LOCATION\n1,x\n");
        assert_eq!(table.detect_address_column(), Some(1));

        let (_f, table) = table_from("id,street,city\n1,x,y\n");
        assert_eq!(table.detect_address_column(), None);
    }

    #[test]
    fn test_column_by_name() {
        let (_f, table) = table_from("id,Street,City\n1,x,y\n");
        assert_eq!(table.column_by_name("Street").unwrap(), 1);
        assert_eq!(table.column_by_name("city").unwrap(), 2);
        assert!(matches!(
            table.column_by_name("zip"),
            Err(TableError::UnknownColumn(_, _))
        ));
        assert!(table.check_column(3).is_err());
    }

    #[test]
    fn test_short_rows_yield_missing_addresses() {
        let (_f, table) = table_from("id,Address\n1,1 Main St\n2\n3,\n");
        assert_eq!(
            table.addresses(1),
            vec![Some("1 Main St"), None, Some("")]
        );
    }

    #[test]
    fn test_write_appends_result_columns() {
        let (_f, table) = table_from("id,Address\n1,Window Rock AZ\n2\n");
        let outcomes = vec![window_rock(), no_data()];

        let out = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        table.write_csv(out.path(), &outcomes).unwrap();

        let written = std::fs::read_to_string(out.path()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines[0],
            "id,Address,Latitude,Longitude,On_Tribal_Land,Tribal_Area"
        );
        assert_eq!(lines[1], "1,Window Rock AZ,35.5,-109.25,Yes,Navajo Nation");
        assert_eq!(lines[2], "2,,,,No Data,");
    }

    #[test]
    fn test_long_rows_keep_result_columns_aligned() {
        let (_f, table) = table_from("id,Address\n1,Window Rock AZ,extra\n");

        let out = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        table.write_csv(out.path(), &[window_rock()]).unwrap();

        let written = AddressTable::read_csv(out.path()).unwrap();
        let status = written.column_by_name("On_Tribal_Land").unwrap();
        let area = written.column_by_name("Tribal_Area").unwrap();
        assert_eq!(written.rows[0].get(status), Some("Yes"));
        assert_eq!(written.rows[0].get(area), Some("Navajo Nation"));
        assert_eq!(written.rows[0].len(), written.headers.len());
    }

    #[test]
    fn test_write_rejects_row_mismatch() {
        let (_f, table) = table_from("id,Address\n1,x\n");
        let out = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        assert!(matches!(
            table.write_csv(out.path(), &[]),
            Err(TableError::RowMismatch { .. })
        ));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(TableFormat::from_path(Path::new("a.csv")), TableFormat::Csv);
        assert_eq!(TableFormat::from_path(Path::new("a.XLSX")), TableFormat::Spreadsheet);
        assert_eq!(TableFormat::from_path(Path::new("a.xls")), TableFormat::Spreadsheet);
        assert_eq!(TableFormat::from_path(Path::new("addresses")), TableFormat::Csv);
    }

    #[test]
    fn test_read_first_sheet_by_default() {
        let file = workbook_from(&[(
            "Properties",
            &[&["Owner", "Property Address"], &["A", "1 Main St"], &["B", ""]],
        )]);

        let table = AddressTable::read(file.path(), None).unwrap();
        assert_eq!(table.sheet.as_deref(), Some("Properties"));
        assert_eq!(table.column_names(), vec!["Owner", "Property Address"]);
        assert_eq!(table.detect_address_column(), Some(1));
        assert_eq!(table.len(), 2);
        assert_eq!(table.addresses(1)[0], Some("1 Main St"));
    }

    #[test]
    fn test_read_sheet_by_name_or_index() {
        let file = workbook_from(&[
            ("Notes", &[&["text"], &["nothing here"]]),
            ("Listings", &[&["id", "Address"], &["7", "Tuba City AZ"]]),
        ]);

        let by_name = AddressTable::read(file.path(), Some("Listings")).unwrap();
        assert_eq!(by_name.addresses(1), vec![Some("Tuba City AZ")]);

        let by_index = AddressTable::read(file.path(), Some("1")).unwrap();
        assert_eq!(by_index.sheet.as_deref(), Some("Listings"));

        assert!(matches!(
            AddressTable::read(file.path(), Some("Missing")),
            Err(TableError::UnknownSheet(_, _))
        ));
    }

    #[test]
    fn test_xlsx_output_round_trip() {
        let input = workbook_from(&[(
            "Properties",
            &[&["id", "Address"], &["1", "Window Rock AZ"], &["2", ""]],
        )]);
        let table = AddressTable::read(input.path(), None).unwrap();

        let out = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        table.write(out.path(), &[window_rock(), no_data()]).unwrap();

        let written = AddressTable::read(out.path(), None).unwrap();
        assert_eq!(written.sheet.as_deref(), Some("Properties"));
        assert_eq!(
            written.column_names(),
            vec!["id", "Address", "Latitude", "Longitude", "On_Tribal_Land", "Tribal_Area"]
        );
        assert_eq!(written.rows[0].get(2), Some("35.5"));
        assert_eq!(written.rows[0].get(3), Some("-109.25"));
        assert_eq!(written.rows[0].get(4), Some("Yes"));
        assert_eq!(written.rows[0].get(5), Some("Navajo Nation"));
        assert_eq!(written.rows[1].get(4), Some("No Data"));
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/data/properties.csv")),
            PathBuf::from("/data/properties_tribal_checked.csv")
        );
        assert_eq!(
            default_output_path(Path::new("list.xlsx")),
            PathBuf::from("list_tribal_checked.xlsx")
        );
    }
}
