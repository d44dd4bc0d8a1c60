//! Persistence layout, append-stream and snapshot behavior

mod common;

use std::collections::HashSet;

use yanyue_harvester::models::{CatalogEntry, ProductDetail, ProductRef};
use yanyue_harvester::store::{brand_key, SectionStore};

fn brand(name: &str, href: &str) -> CatalogEntry {
    CatalogEntry {
        name: name.to_string(),
        href: href.to_string(),
        tag: "默认".to_string(),
    }
}

fn detail(href: &str, name: &str) -> ProductDetail {
    ProductDetail {
        name: name.to_string(),
        href: href.to_string(),
        raw_text: format!("{name} 的完整页面文本"),
        ..ProductDetail::default()
    }
}

#[test]
fn brand_snapshot_writes_json_and_csv() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SectionStore::new(tmp.path(), "tobacco").unwrap();

    let brands = vec![
        brand("中华", "https://www.yanyue.cn/sort_14"),
        brand("黄鹤楼", "https://www.yanyue.cn/sort_21"),
    ];
    store.write_brand_snapshot(&brands).unwrap();

    let json_path = store.dir().join("brands_tobacco.json");
    let loaded: Vec<CatalogEntry> =
        serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(loaded, brands);

    let csv = std::fs::read_to_string(store.dir().join("brands_tobacco.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("name,href,tab"));
    assert_eq!(lines.clone().count(), 2);
}

#[test]
fn detail_stream_accumulates_and_checkpoint_reads_back() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SectionStore::new(tmp.path(), "hnb").unwrap();
    let brand_store = store
        .brand_store(&brand("中华", "https://www.yanyue.cn/sort_14"))
        .unwrap();

    assert!(brand_store.recorded_hrefs().is_empty());

    brand_store
        .append_detail(&detail("https://www.yanyue.cn/pp_1", "软中华"))
        .unwrap();
    brand_store
        .append_detail(&detail("https://www.yanyue.cn/pp_2", "硬中华"))
        .unwrap();

    let recorded = brand_store.recorded_hrefs();
    assert_eq!(recorded.len(), 2);
    assert!(recorded.contains("https://www.yanyue.cn/pp_1"));

    // Append order is preserved on read-back.
    let stream = brand_store.read_stream();
    assert_eq!(stream[0].name, "软中华");
    assert_eq!(stream[1].name, "硬中华");
}

#[test]
fn snapshot_matches_stream_and_csv_drops_raw_text() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SectionStore::new(tmp.path(), "e").unwrap();
    let brand_store = store
        .brand_store(&brand("悦刻", "https://www.yanyue.cn/sort_88"))
        .unwrap();

    let mut first = detail("https://www.yanyue.cn/pp_10", "悦刻一代");
    first.pack_price = "¥299.00".to_string();
    brand_store.append_detail(&first).unwrap();
    brand_store
        .append_detail(&detail("https://www.yanyue.cn/pp_11", "悦刻四代"))
        .unwrap();

    let stream = brand_store.read_stream();
    brand_store.write_detail_snapshot(&stream).unwrap();

    let snapshot: Vec<ProductDetail> = serde_json::from_str(
        &std::fs::read_to_string(brand_store.dir().join("sort_88_details.json")).unwrap(),
    )
    .unwrap();
    let snapshot_hrefs: HashSet<&str> = snapshot.iter().map(|d| d.href.as_str()).collect();
    let stream_hrefs: HashSet<&str> = stream.iter().map(|d| d.href.as_str()).collect();
    assert_eq!(snapshot_hrefs, stream_hrefs);
    assert_eq!(snapshot[0].pack_price, "¥299.00");
    assert!(
        !snapshot[0].raw_text.is_empty(),
        "JSON keeps the raw-text backup"
    );

    let csv = std::fs::read_to_string(brand_store.dir().join("sort_88_details.csv")).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.starts_with("name,href,heat"));
    assert!(!header.contains("raw_text"));
    assert!(!csv.contains("完整页面文本"), "raw text never reaches the CSV");

    // The append-side CSV carries the same fixed header.
    let stream_csv =
        std::fs::read_to_string(brand_store.dir().join("sort_88_details_stream.csv")).unwrap();
    assert_eq!(stream_csv.lines().next(), Some(header));
}

#[test]
fn product_snapshot_roundtrip_enables_reuse() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SectionStore::new(tmp.path(), "tobacco").unwrap();
    let brand_store = store
        .brand_store(&brand("利群", "https://www.yanyue.cn/sort_30"))
        .unwrap();

    assert!(brand_store.load_products().is_none());

    let products = vec![
        ProductRef {
            name: "利群(新版)".to_string(),
            href: "https://www.yanyue.cn/pp_5".to_string(),
        },
        ProductRef {
            name: "利群(硬)".to_string(),
            href: "https://www.yanyue.cn/pp_6".to_string(),
        },
    ];
    brand_store.write_products(&products).unwrap();
    assert_eq!(brand_store.load_products(), Some(products));
}

#[test]
fn unparsable_stream_lines_are_skipped() {
    let tmp = tempfile::tempdir().unwrap();
    let store = SectionStore::new(tmp.path(), "tobacco").unwrap();
    let brand_store = store
        .brand_store(&brand("中华", "https://www.yanyue.cn/sort_14"))
        .unwrap();

    brand_store
        .append_detail(&detail("https://www.yanyue.cn/pp_1", "软中华"))
        .unwrap();
    let stream_path = brand_store.dir().join("sort_14_details.ndjson");
    let mut contents = std::fs::read_to_string(&stream_path).unwrap();
    contents.push_str("{not json}\n");
    std::fs::write(&stream_path, contents).unwrap();
    brand_store
        .append_detail(&detail("https://www.yanyue.cn/pp_2", "硬中华"))
        .unwrap();

    let recorded = brand_store.recorded_hrefs();
    assert_eq!(recorded.len(), 2, "bad line skipped, good lines kept");
}

#[test]
fn brand_keys_are_stable_directory_names() {
    assert_eq!(brand_key("https://www.yanyue.cn/sort_14"), "sort_14");
    assert_eq!(
        brand_key("https://www.yanyue.cn/sort_14"),
        brand_key("https://www.yanyue.cn/sort_14?from=tab")
    );
}
