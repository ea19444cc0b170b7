use std::sync::Arc;

use clap::{Parser, ValueEnum};
use nestql::catalog::{Catalog, ElementDef, GroupDefinition};
use nestql::executor::InMemoryExecutor;
use nestql::template::{Binding, TemplateDef};
use nestql::types::{DataType, Value};
use nestql::{row, AssemblyConfig, AssemblyStrategy, DocumentEngine, XmlWriter};

const ITEMS: &str = "SELECT itemNum, itemName, itemQuantity, itemStatus FROM items";
const SUPPLIERS: &str =
    "SELECT supplierNum, supplierName, supplierZipCode FROM suppliers WHERE itemNum = ?";
const ORDERS: &str = "SELECT orderNum, orderDate, orderQty FROM orders WHERE itemNum = ?";

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    Auto,
    DepthFirst,
    Batched,
}

/// Assembles the items/suppliers/orders document and prints it as XML
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Resolution strategy
    #[arg(short, long, value_enum, default_value = "auto")]
    strategy: Strategy,

    /// Name of the enclosing XML element
    #[arg(short, long, default_value = "itemsDoc")]
    root_tag: String,
}

fn catalog() -> nestql::Result<Catalog> {
    let items = GroupDefinition::virtual_group(
        "xmltest.items",
        vec![
            ElementDef::new("itemNum", DataType::Int64)?,
            ElementDef::new("itemName", DataType::String)?,
            ElementDef::new("itemQuantity", DataType::Int64)?,
            ElementDef::new("itemStatus", DataType::String)?,
        ],
        TemplateDef::uncorrelated(ITEMS),
    )?;
    let suppliers = GroupDefinition::virtual_group(
        "xmltest.suppliers",
        vec![
            ElementDef::new("supplierNum", DataType::String)?,
            ElementDef::new("supplierName", DataType::String)?,
            ElementDef::new("supplierZipCode", DataType::String)?,
        ],
        TemplateDef::new(SUPPLIERS, vec![Binding::new("xmltest.items.itemNum")]),
    )?;
    let orders = GroupDefinition::virtual_group(
        "xmltest.orders",
        vec![
            ElementDef::new("orderNum", DataType::Int64)?,
            ElementDef::new("orderDate", DataType::Date)?,
            ElementDef::new("orderQty", DataType::Int64)?,
        ],
        TemplateDef::new(ORDERS, vec![Binding::new("xmltest.items.itemNum")]),
    )?;
    Catalog::from_definitions(vec![items, suppliers, orders])
}

fn executor() -> nestql::Result<InMemoryExecutor> {
    let shipped = Value::from("2024-03-01").coerce_to(DataType::Date)?;
    Ok(InMemoryExecutor::new()
        .with_rows(ITEMS, vec![], vec![row![1, "A", 5, "OK"], row![2, "B", 3, "OK"]])
        .with_rows(SUPPLIERS, vec![Value::from(1)], vec![row!["S1", "Acme", "00001"]])
        .with_rows(
            SUPPLIERS,
            vec![Value::from(2)],
            vec![row!["S2", "Zenith", "00002"], row!["S3", "Orbit", None::<&str>]],
        )
        .with_rows(ORDERS, vec![Value::from(1)], vec![row![7001, shipped, 5]])
        .with_batch_support(true))
}

fn main() -> nestql::Result<()> {
    let args = Args::parse();
    let strategy = match args.strategy {
        Strategy::Auto => AssemblyStrategy::Auto,
        Strategy::DepthFirst => AssemblyStrategy::DepthFirst,
        Strategy::Batched => AssemblyStrategy::Batched,
    };

    let executor = Arc::new(executor()?);
    let engine = DocumentEngine::new(Arc::new(catalog()?), executor.clone())
        .with_config(AssemblyConfig::new().with_strategy(strategy));

    let doc = engine.assemble_blocking("xmltest.items")?;
    println!("{}", XmlWriter::render(&doc, &args.root_tag)?);
    eprintln!(
        "{} node(s), {} executor call(s)",
        doc.node_count(),
        executor.call_count()
    );
    Ok(())
}
