use std::path::{Path, PathBuf};

use oceanid::profile::{Trait, TRAIT_COUNT};
use oceanid::{
    consistency_report, AnalysisConfig, CacheKey, ConsistencyReport, ConvergenceAnalysis,
    DirectoryLoader, JsonVectorStore, ProfileLoader, ReportCache, ReportDetail, SqliteVectorStore,
    VectorStore,
};
use rusqlite::{params, Connection};

fn write_db(dir: &Path, name: &str, rows: &[[Option<f64>; TRAIT_COUNT]]) -> PathBuf {
    let path = dir.join(name);
    let conn = Connection::open(&path).expect("create db");
    conn.execute(
        "CREATE TABLE personality (
            id INTEGER PRIMARY KEY,
            openness REAL,
            conscientiousness REAL,
            extraversion REAL,
            agreeableness REAL,
            neuroticism REAL
        )",
        [],
    )
    .expect("create table");
    for row in rows {
        conn.execute(
            "INSERT INTO personality (openness, conscientiousness, extraversion, agreeableness, neuroticism)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![row[0], row[1], row[2], row[3], row[4]],
        )
        .expect("insert row");
    }
    path
}

fn wave(count: usize, centre: f64, phase: usize) -> Vec<[Option<f64>; TRAIT_COUNT]> {
    (0..count)
        .map(|i| {
            std::array::from_fn(|d| {
                let slow = ((i * 7 + d * 3 + phase) as f64 * 0.53).sin();
                let fast = ((i * (d + 2)) as f64 * 0.29).cos();
                Some(centre + 0.6 * slow + 0.3 * fast)
            })
        })
        .collect()
}

#[test]
fn sqlite_store_skips_incomplete_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut rows = wave(10, 3.0, 0);
    rows[2][Trait::Extraversion.index()] = None;
    rows[7][Trait::Neuroticism.index()] = None;
    write_db(dir.path(), "gpt_persona.db", &rows);

    let profile = SqliteVectorStore::new(dir.path())
        .load("gpt_persona.db")
        .expect("load");
    assert_eq!(profile.name(), "gpt_persona");
    assert_eq!(profile.len(), 8);
    let first = rows[0].map(|v| v.expect("complete"));
    assert_eq!(profile.vectors()[0].values(), &first);
}

#[test]
fn sqlite_store_requires_complete_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_db(dir.path(), "empty.db", &[[None; TRAIT_COUNT]]);
    let err = SqliteVectorStore::new(dir.path()).load("empty.db").unwrap_err();
    assert!(err.to_string().contains("no complete personality rows"));
}

#[test]
fn sqlite_store_reports_missing_table() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("blank.db");
    Connection::open(&path)
        .expect("create db")
        .execute("CREATE TABLE other (x REAL)", [])
        .expect("create table");
    assert!(SqliteVectorStore::load_path(&path).is_err());
}

#[test]
fn directory_loader_reads_db_files_in_name_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_db(dir.path(), "b_model.db", &wave(12, 3.5, 1));
    write_db(dir.path(), "a_human.db", &wave(12, 3.0, 0));
    std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write notes");

    let profiles = DirectoryLoader::new(dir.path())
        .load_profiles()
        .expect("profiles");
    let names: Vec<_> = profiles.iter().map(|p| p.name()).collect();
    assert_eq!(names, ["a_human", "b_model"]);

    let analysis = ConvergenceAnalysis::run(&profiles, &AnalysisConfig::default()).expect("run");
    assert_eq!(analysis.reference_rows, 24);
}

#[test]
fn directory_loader_needs_two_profiles() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_db(dir.path(), "only.db", &wave(8, 3.0, 0));
    let err = DirectoryLoader::new(dir.path()).load_profiles().unwrap_err();
    assert!(err.to_string().contains("at least two"));
}

#[test]
fn json_store_round_trips_a_profile() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("source.db");
    write_db(dir.path(), "source.db", &wave(9, 2.5, 4));
    let profile = SqliteVectorStore::load_path(&source).expect("load");

    ProfileLoader::write_to_path(&profile, &dir.path().join("source.json")).expect("write");
    let restored = JsonVectorStore::new(dir.path())
        .load("source.json")
        .expect("restore");
    assert_eq!(restored.name(), profile.name());
    assert_eq!(restored.vectors(), profile.vectors());
}

#[test]
fn consistency_report_is_cached_by_input_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_db(dir.path(), "steady.db", &wave(20, 3.0, 2));
    let config = AnalysisConfig::default();
    let cache = ReportCache::new(dir.path().join("cache"));
    let key = CacheKey::new(&[path.clone()], &config).expect("key");

    let computed = cache
        .get_or_compute(&key, || {
            let profile = SqliteVectorStore::load_path(&path)?;
            consistency_report(&profile, &config, ReportDetail::Summary)
        })
        .expect("computed");
    let cached: ConsistencyReport = cache
        .get_or_compute(&key, || Err(anyhow::anyhow!("cache should have been hit")))
        .expect("cached");
    assert_eq!(computed, cached);
}
