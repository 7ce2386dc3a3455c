use jpatch_benches::available_corpora;
use jpatch_core::Diff;

#[test]
fn jpatch_benches_readme_example() -> Result<(), Box<dyn std::error::Error>> {
    let corpus = available_corpora()
        .iter()
        .find(|c| c.name() == "medium")
        .expect("registered corpus");
    let dataset = corpus.load()?;
    println!("{} operations", dataset.patch().len());

    let record = Diff::prepare(dataset.before(), dataset.patch())?;
    assert_eq!(record.revert(dataset.after())?, *dataset.before());
    Ok(())
}
