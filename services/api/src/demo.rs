use crate::infra::memory_gateway;
use chrono::{Local, NaiveDate};
use clap::Args;
use goods_receipt::config::{AppConfig, ReceivingConfig};
use goods_receipt::error::AppError;
use goods_receipt::inventory::{
    following_sequence, AddDocumentCoordinator, ContractorsCoordinator, Document,
    DocumentsCoordinator, EditDocumentCoordinator, InventoryGateway, Item, LineItems,
};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Receipt date for the documents created by the demo (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) date: Option<NaiveDate>,
    /// Skip the edit and delete portion of the walkthrough.
    #[arg(long)]
    pub(crate) skip_edit: bool,
}

const SETTLE: Duration = Duration::from_secs(2);

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { date, skip_edit } = args;
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let receiving = match AppConfig::load() {
        Ok(config) => config.receiving,
        Err(err) => {
            println!("Configuration unreadable ({err}); using default units");
            ReceivingConfig::default()
        }
    };

    let gateway = memory_gateway();
    println!("Goods receipt demo ({date})");

    let contractors = ContractorsCoordinator::new(gateway.clone());
    for (name, symbol) in [
        ("Hurtownia Budowlana Acme", "ACM"),
        ("Bolt Sp. z o.o.", "BLT"),
        ("Hurtownia Budowlana Acme", "ACM"),
    ] {
        let _ = contractors.add_contractor(name, symbol).await;
    }
    let listed = wait_for(contractors.subscribe(), |list| list.len() >= 2).await;
    println!("\nContractors ({} after a repeated add)", listed.len());
    for contractor in &listed {
        println!("- {} [{}]", contractor.name, contractor.symbol);
    }
    let Some(acme) = listed
        .iter()
        .find(|contractor| contractor.symbol == "ACM")
        .and_then(|contractor| contractor.uid.clone())
    else {
        println!("Contractor list never settled; stopping");
        return Ok(());
    };

    let composer = AddDocumentCoordinator::new(gateway.clone(), receiving.unit_options);
    println!("\nUnits on offer: {}", composer.unit_options().join(", "));
    for (name, unit, amount) in [("Cement", "kg", "25"), ("Wkręty 4x40", "szt", "200")] {
        let _ = composer.add_item(name, unit, amount).await;
    }
    let catalog = wait_for(composer.subscribe_catalog(), |items| items.len() >= 2).await;
    println!("Catalog holds {} items", catalog.len());

    let mut lines = LineItems::new();
    for item in catalog {
        if let Err(err) = lines.add(item) {
            println!("  {err}");
        }
    }
    if let Err(err) = lines.add(Item::new("Cement", "kg", "5")) {
        println!("  Rejected line: {err}");
    }

    let documents = DocumentsCoordinator::new(gateway.clone());
    let mut created = Vec::new();
    for items in [lines.as_slice().to_vec(), vec![Item::new("Piasek", "kg", "500")]] {
        match composer.add_document_dated(&acme, items, date).await {
            Ok(Ok(document)) => created.push(document),
            Ok(Err(err)) => println!("  Document refused: {err}"),
            Err(err) => println!("  Document task failed: {err}"),
        }
    }
    println!("Last assigned sequence: {}", composer.next_number());

    let listed = wait_for(documents.subscribe(), |list| list.len() >= created.len()).await;
    println!("\nDocuments by PZ sequence");
    render_documents(&listed);

    if skip_edit {
        return Ok(());
    }

    let Some(first) = created.first().and_then(|document| document.uid.clone()) else {
        return Ok(());
    };
    let editor = EditDocumentCoordinator::new(gateway.clone(), &first, &acme);
    wait_for(editor.subscribe_document(), Option::is_some).await;
    let mut lines = editor.line_items();
    let cement = Item::new("Cement", "kg", "25");
    lines.replace(&cement, Item::new("Cement", "kg", "30"));
    let _ = editor.update_document(None, Some(lines.into_vec())).await;
    let edited = wait_for(editor.subscribe_document(), |document| {
        document
            .as_ref()
            .is_some_and(|document| document.items.iter().any(|item| item.amount == "30"))
    })
    .await;
    if let Some(document) = edited {
        println!(
            "\nEdited {}: {} lines",
            document.number.as_deref().unwrap_or("(unnumbered)"),
            document.items.len()
        );
    }

    let _ = documents.delete_document(&first).await;
    let remaining = wait_for(documents.subscribe(), |list| list.len() < created.len()).await;
    println!("\nAfter deleting {first}");
    render_documents(&remaining);
    match following_sequence(gateway.next_pz_number().await) {
        Ok(next) => println!("Next PZ sequence would be {next}"),
        Err(err) => println!("No further PZ sequence: {err}"),
    }

    Ok(())
}

/// Wait briefly for `ready`, returning whatever the holder has either way.
async fn wait_for<T, F>(mut receiver: watch::Receiver<T>, ready: F) -> T
where
    T: Clone,
    F: FnMut(&T) -> bool,
{
    let _ = tokio::time::timeout(SETTLE, receiver.wait_for(ready)).await;
    let value = receiver.borrow().clone();
    value
}

fn render_documents(documents: &[Document]) {
    for document in documents {
        let contractor = document
            .contractor
            .as_ref()
            .map(|contractor| contractor.name.as_str())
            .unwrap_or("unknown contractor");
        println!(
            "- {} | {} | {} | {} lines",
            document.number.as_deref().unwrap_or("(unnumbered)"),
            document.date.as_deref().unwrap_or("-"),
            contractor,
            document.items.len()
        );
    }
}
