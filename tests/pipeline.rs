mod common;

use async_compression::tokio::write::{GzipEncoder, ZstdEncoder};
use common::{write_csv, MemoryStore};
use encoding_rs::{UTF_8, WINDOWS_1252};
use tokio::io::AsyncWriteExt;
use user_upload::pipeline::{dry_run, import, ingest_path};
use user_upload::{
    build_csv_reader, collect_records, load, process_csv_stream, Compression, CsvMeta, RawRow,
    RejectionReason, RowStream, UploadError, UserRecord,
};

const USERS: &str = "\
name,surname,email
jane,DOE,Jane.Doe@EXAMPLE.com
john,smith,not-an-email
mARY,o'neil,mary@example.org
,nobody,nobody@example.org
li,wei,li@b
Émile,zola,EMILE@Example.FR
";

#[tokio::test]
async fn keeps_valid_rows_in_file_order() -> anyhow::Result<()> {
    let result = process_csv_stream(USERS.as_bytes()).await?;

    assert_eq!(result.rows_read, 6);
    let emails: Vec<&str> = result.records.iter().map(|u| u.email()).collect();
    assert_eq!(
        emails,
        vec!["jane.doe@example.com", "mary@example.org", "emile@example.fr"]
    );
    assert_eq!(result.records[0].name(), "Jane");
    assert_eq!(result.records[0].surname(), "Doe");
    assert_eq!(result.records[1].name(), "Mary");
    assert_eq!(result.records[1].surname(), "O'neil");

    let rejected: Vec<(u64, &RejectionReason)> =
        result.rejected.iter().map(|r| (r.line, &r.reason)).collect();
    assert_eq!(
        rejected,
        vec![
            (2, &RejectionReason::InvalidEmailFormat("not-an-email".into())),
            (4, &RejectionReason::EmptyField("name")),
            (5, &RejectionReason::InvalidEmailFormat("li@b".into())),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn column_order_and_extra_columns_do_not_matter() -> anyhow::Result<()> {
    let csv = "id,email,surname,name,notes\n7,A@B.COM,doe,jane,hello\n";
    let result = process_csv_stream(csv.as_bytes()).await?;
    assert_eq!(
        result.records,
        vec![UserRecord::new("Jane", "Doe", "a@b.com").unwrap()]
    );
    Ok(())
}

#[tokio::test]
async fn short_row_is_rejected_not_fatal() -> anyhow::Result<()> {
    let csv = "name,surname,email\njane,doe\njohn,doe,john@doe.com\n";
    let result = process_csv_stream(csv.as_bytes()).await?;
    assert_eq!(result.records.len(), 1);
    assert_eq!(
        result.rejected[0].reason,
        RejectionReason::MissingField("email")
    );
    Ok(())
}

#[tokio::test]
async fn missing_header_fails_the_stream() {
    let csv = "name,Surname,email\njane,doe,jane@doe.com\n";
    let err = process_csv_stream(csv.as_bytes()).await.unwrap_err();
    assert!(matches!(err, UploadError::MissingHeader(h) if h == "surname"));
}

#[tokio::test]
async fn header_bom_is_ignored() -> anyhow::Result<()> {
    let csv = "\u{feff}name,surname,email\njane,doe,jane@doe.com\n";
    let result = process_csv_stream(csv.as_bytes()).await?;
    assert_eq!(result.records.len(), 1);
    Ok(())
}

#[tokio::test]
async fn undecodable_row_is_rejected_and_reading_continues() -> anyhow::Result<()> {
    let csv: &[u8] =
        b"name,surname,email\njane,doe,jane@doe.com\nJos\xe9,doe,jose@doe.com\njohn,doe,john@doe.com\n";
    let result = process_csv_stream(csv).await?;

    assert_eq!(result.rows_read, 3);
    let emails: Vec<&str> = result.records.iter().map(|u| u.email()).collect();
    assert_eq!(emails, vec!["jane@doe.com", "john@doe.com"]);
    assert_eq!(result.rejected.len(), 1);
    assert_eq!(result.rejected[0].line, 2);
    assert!(matches!(
        result.rejected[0].reason,
        RejectionReason::MalformedRow(_)
    ));
    Ok(())
}

#[tokio::test]
async fn row_stream_reports_each_line_then_end() -> anyhow::Result<()> {
    let csv: &[u8] = b"name,surname,email\n\xff,b,c@d.com\nann,lee,ann@lee.io\n";
    let mut rows = RowStream::open(csv).await?;

    let first = rows.next_row().await?.expect("first line");
    assert_eq!(first.unwrap_err().line, 1);

    let second = rows.next_row().await?.expect("second line").unwrap();
    assert_eq!(second.line(), 2);
    assert_eq!(second.get("email"), Some("ann@lee.io"));

    assert!(rows.next_row().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn stream_error_stops_collection() {
    let rows = futures::stream::iter(vec![
        Ok(Ok(RawRow::from_pairs([
            ("name", "a"),
            ("surname", "b"),
            ("email", "a@b.com"),
        ]))),
        Err(UploadError::Io(std::io::Error::other("disk gone"))),
    ]);
    assert!(matches!(
        collect_records(rows).await,
        Err(UploadError::Io(_))
    ));
}

#[tokio::test]
async fn dry_run_matches_import_and_leaves_table_alone() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_csv(dir.path(), "users.csv", USERS)?;

    let preview = dry_run(&path, UTF_8).await?;

    let mut store = MemoryStore::with_table();
    let (imported, summary) = import(&path, UTF_8, &mut store).await?;

    assert_eq!(preview.records, imported.records);
    assert_eq!(preview.rejected, imported.rejected);
    assert_eq!(summary.inserted, 3);
    assert_eq!(
        store.emails(),
        vec!["jane.doe@example.com", "mary@example.org", "emile@example.fr"]
    );
    Ok(())
}

#[tokio::test]
async fn duplicate_email_fails_only_that_insert() -> anyhow::Result<()> {
    let records = vec![
        UserRecord::new("jane", "doe", "jane@doe.com").unwrap(),
        UserRecord::new("JANE", "DOE", "JANE@DOE.COM").unwrap(),
        UserRecord::new("john", "doe", "john@doe.com").unwrap(),
    ];
    let mut store = MemoryStore::with_table();

    let summary = load(&mut store, &records).await;

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.inserted, 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].email, "jane@doe.com");
    assert!(summary.failed[0].error.contains("Duplicate entry"));
    // first insert is kept
    assert_eq!(store.emails(), vec!["jane@doe.com", "john@doe.com"]);
    Ok(())
}

#[tokio::test]
async fn unreadable_file_inserts_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut store = MemoryStore::with_table();

    let err = import(&dir.path().join("missing.csv"), UTF_8, &mut store)
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Io(_)));
    assert!(store.emails().is_empty());
    Ok(())
}

#[tokio::test]
async fn reads_gzip_input() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let gz_path = dir.path().join("users.csv.gz");

    let mut csv = String::from("name,surname,email\n");
    for i in 0..10_000 {
        csv.push_str(&format!("user,NUMBER{i},User{i}@Example.com\n"));
    }
    let mut encoder = GzipEncoder::new(tokio::fs::File::create(&gz_path).await?);
    encoder.write_all(csv.as_bytes()).await?;
    encoder.shutdown().await?;

    let result = ingest_path(&gz_path, UTF_8).await?;

    assert_eq!(result.rows_read, 10_000);
    assert_eq!(result.records.len(), 10_000);
    assert_eq!(result.records[9_999].email(), "user9999@example.com");
    assert_eq!(result.records[9_999].surname(), "Number9999");
    Ok(())
}

#[tokio::test]
async fn transcodes_legacy_charset() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("latin1.csv");
    std::fs::write(&path, b"name,surname,email\nJOS\xc9,n\xfa\xd1ez,jose@example.es\n")?;

    let result = ingest_path(&path, WINDOWS_1252).await?;

    assert_eq!(result.records[0].name(), "José");
    assert_eq!(result.records[0].surname(), "Núñez");
    Ok(())
}

#[tokio::test]
async fn reads_zstd_from_any_reader() -> anyhow::Result<()> {
    let mut encoder = ZstdEncoder::new(Vec::new());
    encoder
        .write_all(b"name,surname,email\nada,LOVELACE,Ada@Engine.org\n")
        .await?;
    encoder.shutdown().await?;
    let compressed = encoder.into_inner();

    let meta = CsvMeta {
        compression: Compression::Zstd,
        ..Default::default()
    };
    let result = process_csv_stream(build_csv_reader(std::io::Cursor::new(compressed), &meta)).await?;

    assert_eq!(
        result.records,
        vec![UserRecord::new("Ada", "Lovelace", "ada@engine.org").unwrap()]
    );
    Ok(())
}
