use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Parses a JSON file into a given type `T`.
///
/// Errors are converted into `crate::error::Error` variants:
/// - `Error::IoError` if the file cannot be read.
/// - `Error::DeserializationError` if the JSON is malformed.
pub fn parse_json_file<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<T> {
    let data = fs::read_to_string(file_path.as_ref()).map_err(Error::IoError)?;

    let parsed_data: T = serde_json::from_str(&data).map_err(Error::DeserializationError)?;

    Ok(parsed_data)
}

/// Reads a headerless, comma separated file into records of type `T`.
///
/// Fields are matched to `T` by position and trimmed. Rows may be shorter
/// than `T`; missing trailing fields must be `Option`s. Blank lines and lines
/// starting with `#` are skipped.
pub fn parse_csv_file<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<Vec<T>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(file_path.as_ref())?;

    let records = reader.deserialize::<T>().collect::<std::result::Result<Vec<T>, csv::Error>>()?;

    log::debug!("Parsed {} records from '{}'.", records.len(), file_path.as_ref().display());
    Ok(records)
}

/// Writes `records` as a headerless, comma separated file, replacing any previous content.
pub fn write_csv_file<T: Serialize>(file_path: impl AsRef<Path>, records: &[T]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(file_path.as_ref())?;

    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    log::debug!("Wrote {} records to '{}'.", records.len(), file_path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::facility_dto::FacilityDto;
    use crate::api::parking_config_dto::ParkingConfigDto;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("smart_parking_parser_{}_{}", std::process::id(), name))
    }

    #[test]
    fn short_rows_leave_optional_fields_empty() {
        let path = temp_path("facilities.csv");
        fs::write(&path, "# id,location,total,available,rating,lat,lon\n1, MG Road ,10,4,4.5,12.9,77.6\n\n2,Indiranagar,5,5,3.0,12.97,77.64,15.5,true,false,true,false,8\n").unwrap();

        let records: Vec<FacilityDto> = parse_csv_file(&path).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].location, "MG Road");
        assert_eq!(records[0].cost_per_hour, None);
        assert_eq!(records[0].amenity_preset, None);
        assert_eq!(records[1].cost_per_hour, Some(15.5));
        assert_eq!(records[1].ev_charging, Some(true));
        assert_eq!(records[1].amenity_preset, Some(8));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_numbers_are_csv_errors() {
        let path = temp_path("broken.csv");
        fs::write(&path, "1,A,ten,4,4.5,1,1\n").unwrap();

        let result: Result<Vec<FacilityDto>> = parse_csv_file(&path);
        assert!(matches!(result, Err(Error::CsvError(_))));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_json_file_is_an_io_error() {
        let result: Result<ParkingConfigDto> = parse_json_file(temp_path("does_not_exist.json"));
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
