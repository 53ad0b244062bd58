use polars::prelude::*;
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, trace};

use crate::domain::AVError;
use crate::record::{ColumnId, PushAlert};

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// A column of the loaded frame, every value rendered as a string.
/// List columns also keep their elements.
struct RawColumn {
    name: String,
    data: Vec<Option<String>>,
    lists: Option<Vec<Vec<String>>>,
}

fn alert(
    id: u32,
    title: &str,
    frequency: &str,
    status: &str,
    dates: (&str, &str),
    os: &[&str],
    (sent, open_ratio): (u64, f64),
) -> PushAlert {
    PushAlert {
        id,
        title: title.to_string(),
        frequency: frequency.to_string(),
        status: status.to_string(),
        start_date: dates.0.to_string(),
        end_date: dates.1.to_string(),
        os: os.iter().map(|s| s.to_string()).collect(),
        sent,
        open_ratio,
    }
}

/// The built-in dataset.
#[rustfmt::skip]
pub fn static_alerts() -> Vec<PushAlert> {
    vec![
        alert(1, "Welcome aboard", "Once", "completed", ("2024-01-02", "2024-01-02"), &["iOS", "Android"], (15230, 0.42)),
        alert(2, "Daily digest", "Daily", "active", ("2024-01-05", "2024-12-31"), &["iOS", "Android", "Web"], (98211, 0.18)),
        alert(3, "Weekend flash sale", "Weekly", "active", ("2024-02-03", "2024-06-29"), &["Android"], (40122, 0.27)),
        alert(4, "Cart reminder", "Daily", "paused", ("2024-02-10", "2024-08-10"), &["iOS", "Web"], (22871, 0.33)),
        alert(5, "Monthly statement ready", "Monthly", "active", ("2024-01-31", "2024-12-31"), &["iOS", "Android"], (12004, 0.61)),
        alert(6, "New feature: dark mode", "Once", "completed", ("2024-03-14", "2024-03-14"), &["iOS"], (30555, 0.49)),
        alert(7, "Price drop on your wishlist", "Daily", "active", ("2024-03-01", "2024-09-01"), &["Android", "Web"], (51873, 0.38)),
        alert(8, "Security notice", "Once", "completed", ("2024-03-20", "2024-03-20"), &["iOS", "Android", "Web"], (87410, 0.72)),
        alert(9, "Weekly workout summary", "Weekly", "active", ("2024-01-07", "2024-12-29"), &["iOS", "Android"], (25340, 0.24)),
        alert(10, "Order shipped", "Once", "draft", ("2024-04-02", "2024-04-02"), &[], (0, 0.0)),
        alert(11, "Spring collection launch", "Once", "completed", ("2024-04-05", "2024-04-05"), &["Web"], (18222, 0.21)),
        alert(12, "Streak about to end", "Daily", "paused", ("2024-02-15", "2024-07-15"), &["iOS"], (9321, 0.55)),
        alert(13, "Quarterly report", "Monthly", "draft", ("2024-04-01", "2024-12-01"), &["Web"], (0, 0.0)),
        alert(14, "Friend joined", "Once", "active", ("2024-04-11", "2024-10-11"), &["Android"], (7412, 0.47)),
        alert(15, "Renew your subscription", "Monthly", "active", ("2024-01-15", "2024-12-15"), &["iOS", "Android", "Web"], (33018, 0.36)),
        alert(16, "Back in stock", "Weekly", "paused", ("2024-02-19", "2024-05-19"), &["Android", "Web"], (14550, 0.31)),
        alert(17, "Event starts in 1 hour", "Once", "completed", ("2024-05-02", "2024-05-02"), &["iOS", "Android"], (4410, 0.66)),
        alert(18, "Weekly newsletter", "Weekly", "active", ("2024-01-04", "2024-12-26"), &["Web"], (61200, 0.12)),
        alert(19, "Rate your last order", "Daily", "active", ("2024-03-10", "2024-11-10"), &["iOS"], (20780, 0.09)),
        alert(20, "Summer sale preview", "Once", "draft", ("2024-06-01", "2024-06-01"), &["iOS", "Android", "Web"], (0, 0.0)),
        alert(21, "Loyalty points expiring", "Monthly", "active", ("2024-02-28", "2024-11-28"), &["Android"], (11870, 0.44)),
        alert(22, "App update available", "Once", "completed", ("2024-05-20", "2024-05-20"), &["Android"], (45602, 0.29)),
    ]
}

/// Load records from a CSV, Parquet or Arrow IPC file.
pub fn load_data_file(path: PathBuf) -> Result<Vec<PushAlert>, AVError> {
    let file_info = get_file_info(path)?;
    debug!("Loading {:?}", file_info);
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    // Each column is converted in its own thread.
    let start_time = Instant::now();
    let df = Arc::new(frame.collect()?);
    let columns: Result<Vec<RawColumn>, _> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect();
    let columns = columns?;

    let records = build_records(&columns, df.height())?;
    info!(
        "Loaded {} records ({} bytes) in {}ms",
        records.len(),
        file_info.file_size,
        start_time.elapsed().as_millis()
    );
    Ok(records)
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<RawColumn, PolarsError> {
    let col = df.column(col_name)?;
    let (data, lists) = if let DataType::List(_) = col.dtype() {
        // The text form of a tag list joins its elements with `|`.
        let casted = col.cast(&DataType::List(Box::new(DataType::String)))?;
        let list = casted.list()?;
        let mut lists: Vec<Vec<String>> = Vec::with_capacity(list.len());
        for series in list {
            let mut tags = Vec::new();
            if let Some(s) = series {
                for tag in s.str()?.into_iter().flatten() {
                    tags.push(tag.to_string());
                }
            }
            lists.push(tags);
        }
        let data: Vec<Option<String>> = lists.iter().map(|t| Some(t.join("|"))).collect();
        (data, Some(lists))
    } else {
        let strings = col.cast(&DataType::String)?;
        let data: Vec<Option<String>> = strings
            .str()?
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        (data, None)
    };
    trace!("Loaded column {col_name} with {} rows", data.len());
    Ok(RawColumn {
        name: col_name.to_string(),
        data,
        lists,
    })
}

fn build_records(columns: &[RawColumn], nrows: usize) -> Result<Vec<PushAlert>, AVError> {
    let find = |id: ColumnId| find_column(columns, id);
    let id_column = find(ColumnId::Id).ok();
    let title = find(ColumnId::Title)?;
    let frequency = find(ColumnId::Frequency)?;
    let status = find(ColumnId::Status)?;
    let start_date = find(ColumnId::StartDate)?;
    let end_date = find(ColumnId::EndDate)?;
    let os = find(ColumnId::Os)?;
    let sent = find(ColumnId::Sent)?;
    let open_ratio = find(ColumnId::OpenRatio)?;

    let text = |c: &RawColumn, row: usize| c.data[row].clone().unwrap_or_default();

    let mut seen_ids = HashSet::with_capacity(nrows);
    let mut records = Vec::with_capacity(nrows);
    for row in 0..nrows {
        let id = match id_column {
            Some(c) => parse_number::<u32>(c, row)?,
            None => row as u32 + 1,
        };
        let line = row + 1;
        if !seen_ids.insert(id) {
            let msg = format!("Duplicate id {id} in row {line}");
            return Err(AVError::LoadingFailed(msg));
        }
        let ratio = parse_number::<f64>(open_ratio, row)?;
        if !(0.0..=1.0).contains(&ratio) {
            let msg = format!("Open ratio {ratio} in row {line} is outside 0..=1");
            return Err(AVError::LoadingFailed(msg));
        }
        records.push(PushAlert {
            id,
            title: text(title, row),
            frequency: text(frequency, row),
            status: text(status, row),
            start_date: text(start_date, row),
            end_date: text(end_date, row),
            os: match &os.lists {
                Some(lists) => lists[row].clone(),
                None => split_tags(&text(os, row)),
            },
            sent: parse_number::<u64>(sent, row)?,
            open_ratio: ratio,
        });
    }
    Ok(records)
}

fn find_column(columns: &[RawColumn], id: ColumnId) -> Result<&RawColumn, AVError> {
    columns
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(id.key()))
        .ok_or_else(|| AVError::LoadingFailed(format!("Missing column \"{id}\"")))
}

fn parse_number<T: std::str::FromStr>(column: &RawColumn, row: usize) -> Result<T, AVError> {
    let raw = column.data[row].as_deref().unwrap_or("").trim();
    raw.parse::<T>().map_err(|_| {
        AVError::LoadingFailed(format!(
            "Invalid value \"{raw}\" in column \"{}\", row {}",
            column.name,
            row + 1
        ))
    })
}

/// Tags of a text cell, separated by `|` or `,`. Tags may contain spaces.
fn split_tags(raw: &str) -> Vec<String> {
    raw.split(['|', ','])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn detect_file_type(path: &Path) -> Result<FileType, AVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(AVError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, AVError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => AVError::FileNotFound,
        ErrorKind::PermissionDenied => AVError::PermissionDenied,
        _ => AVError::IoError(e),
    })?;

    if !metadata.is_file() {
        return Err(AVError::LoadingFailed("Not a file!".into()));
    }

    let file_type = detect_file_type(&path)?;
    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn static_ids_are_unique() {
        let records = static_alerts();
        let ids: HashSet<u32> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), records.len());
    }

    #[test]
    fn static_records_are_in_range() {
        for r in static_alerts() {
            assert!((0.0..=1.0).contains(&r.open_ratio), "{}", r.title);
            assert!(r.start_date <= r.end_date, "{}", r.title);
        }
    }

    fn raw(name: &str, values: &[&str]) -> RawColumn {
        RawColumn {
            name: name.to_string(),
            data: values.iter().map(|v| Some(v.to_string())).collect(),
            lists: None,
        }
    }

    fn alert_columns(ids: [&str; 2], ratios: [&str; 2]) -> Vec<RawColumn> {
        vec![
            raw("id", &ids),
            raw("title", &["Hello", "Bye"]),
            raw("frequency", &["Daily", "Once"]),
            raw("status", &["active", "draft"]),
            raw("startDate", &["2024-01-01", "2024-03-01"]),
            raw("endDate", &["2024-02-01", "2024-03-01"]),
            raw("OS", &["Smart TV|Web", "iOS"]),
            raw("sent", &["10", "0"]),
            raw("openRatio", &ratios),
        ]
    }

    fn loading_error(err: AVError) -> String {
        match err {
            AVError::LoadingFailed(msg) => msg,
            other => panic!("expected a loading error, got {other:?}"),
        }
    }

    #[test]
    fn split_tags_accepts_several_separators() {
        assert_eq!(split_tags("iOS|Android"), vec!["iOS", "Android"]);
        assert_eq!(split_tags("iOS, Web"), vec!["iOS", "Web"]);
        assert_eq!(split_tags("  "), Vec::<String>::new());
    }

    #[test]
    fn split_tags_keeps_multi_word_tags() {
        assert_eq!(split_tags("Smart TV | Web"), vec!["Smart TV", "Web"]);
    }

    #[test]
    fn list_columns_keep_their_elements() {
        let mut columns = alert_columns(["1", "2"], ["0.5", "0.0"]);
        columns[6].lists = Some(vec![vec!["Smart TV, 4K".into()], vec![]]);
        let records = build_records(&columns, 2).unwrap();
        assert_eq!(records[0].os, vec!["Smart TV, 4K"]);
        assert!(records[1].os.is_empty());
    }

    #[test]
    fn text_tags_are_split() {
        let columns = alert_columns(["1", "2"], ["0.5", "0.0"]);
        let records = build_records(&columns, 2).unwrap();
        assert_eq!(records[0].os, vec!["Smart TV", "Web"]);
        assert_eq!(records[1].id, 2);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let columns = alert_columns(["7", "7"], ["0.5", "0.0"]);
        let err = build_records(&columns, 2).unwrap_err();
        assert!(loading_error(err).contains("Duplicate id 7"));
    }

    #[test]
    fn open_ratio_outside_unit_range_is_rejected() {
        let columns = alert_columns(["1", "2"], ["0.5", "1.5"]);
        let err = build_records(&columns, 2).unwrap_err();
        assert!(loading_error(err).contains("row 2"));

        let columns = alert_columns(["1", "2"], ["-0.1", "0.0"]);
        assert!(build_records(&columns, 2).is_err());
    }

    #[test]
    fn unknown_extension_is_rejected() {
        assert!(matches!(
            detect_file_type(Path::new("alerts.txt")),
            Err(AVError::UnknownFileType)
        ));
        assert!(matches!(
            detect_file_type(Path::new("alerts.Feather")),
            Ok(FileType::ARROW)
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_data_file(PathBuf::from("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, AVError::FileNotFound));
    }

    #[test]
    fn loads_records_from_csv() {
        let dir = std::env::temp_dir().join(format!("alertview-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("alerts.csv");
        fs::write(
            &path,
            "title,frequency,status,startDate,endDate,OS,sent,openRatio\n\
             Hello,Daily,active,2024-01-01,2024-02-01,iOS|Web,10,0.5\n\
             Bye,Once,paused,2024-03-01,2024-03-01,,0,0.0\n",
        )
        .unwrap();

        let records = load_data_file(path.clone()).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].os, vec!["iOS", "Web"]);
        assert_eq!(records[1].id, 2);
        assert!(records[1].os.is_empty());
        assert_eq!(records[0].sent, 10);
    }

    #[test]
    fn missing_required_column_fails() {
        let columns = vec![raw("title", &["x"])];
        let err = build_records(&columns, 1).unwrap_err();
        assert!(loading_error(err).contains("frequency"));
    }
}
