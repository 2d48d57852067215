use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use amr_genome_fetch::error::FetchError;
use amr_genome_fetch::layout::Layout;
use amr_genome_fetch::table::read_genome_table;

const EXPORT: &str = "\
\"Genome ID\",\"Genome Name\",\"Antibiotic\",\"Resistant Phenotype\"
\"573.12345\",\"Klebsiella pneumoniae strain A\",\"amikacin\",\"Susceptible\"
\"573.22222\",\"Klebsiella pneumoniae strain B\",\"amikacin\",\"Resistant\"
\"\",\"Klebsiella pneumoniae strain C\",\"amikacin\",\"Resistant\"
";

#[test]
fn reads_bvbrc_export_from_layout() {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let layout = Layout::new(root, "klebsiella_pneumoniae", "amikacin", "BVBRC_genome_amr.csv");
    let input = layout.input_path();
    std::fs::create_dir_all(input.parent().unwrap().as_std_path()).unwrap();
    std::fs::write(input.as_std_path(), EXPORT).unwrap();

    let table = read_genome_table(&input).unwrap();
    assert_eq!(table.columns[0], "genome_id");
    let ids: Vec<_> = table.genome_ids().map(|id| id.as_str()).collect();
    assert_eq!(ids, vec!["573.12345", "573.22222"]);
    assert_eq!(table.stats().missing_ids, 1);
    assert_eq!(table.drug_label().unwrap().unwrap().as_str(), "amikacin");
}

#[test]
fn missing_input_file() {
    let err = read_genome_table(&Utf8PathBuf::from("/nonexistent/amr.csv")).unwrap_err();
    assert_matches!(err, FetchError::InputNotFound(_));
}
