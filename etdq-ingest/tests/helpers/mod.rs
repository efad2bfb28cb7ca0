//! Shared test doubles and fixtures for pipeline integration tests
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use etdq_common::config::{
    CatalogSettings, ClassifierSettings, RepositorySettings, Settings, StorageSettings,
    TrackingSettings,
};
use etdq_ingest::error::{CatalogError, StoreError};
use etdq_ingest::models::{splice_electronic_location, BibRecord, DigitizationRequest, UrlUpdate};
use etdq_ingest::services::catalog::Catalog;
use etdq_ingest::services::files::ObjectStore;
use etdq_ingest::stores::{RequestQueue, TrackingStore};

/// In-memory catalog keyed by MMS ID
pub struct MemoryCatalog {
    pub records: Mutex<BTreeMap<String, String>>,
    pub updated: Mutex<Vec<UrlUpdate>>,
}

impl MemoryCatalog {
    pub fn with_records(records: &[(&str, String)]) -> Self {
        Self {
            records: Mutex::new(
                records
                    .iter()
                    .map(|(id, xml)| (id.to_string(), xml.clone()))
                    .collect(),
            ),
            updated: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn fetch(&self, mmsid: &str) -> Result<BibRecord, CatalogError> {
        let records = self.records.lock().unwrap();
        let xml = records.get(mmsid).ok_or(CatalogError::NotFound)?.clone();
        BibRecord::parse(&xml)
    }

    async fn update_electronic_location(
        &self,
        mmsid: &str,
        url: &str,
    ) -> Result<UrlUpdate, CatalogError> {
        let xml = {
            let records = self.records.lock().unwrap();
            records.get(mmsid).ok_or(CatalogError::NotFound)?.clone()
        };
        let (document, old_url) = splice_electronic_location(&xml, url)?;
        let update = UrlUpdate {
            mmsid: mmsid.to_string(),
            old_url,
            new_url: url.to_string(),
        };
        self.records
            .lock()
            .unwrap()
            .insert(mmsid.to_string(), document);
        self.updated.lock().unwrap().push(update.clone());
        Ok(update)
    }
}

/// In-memory object store keyed by full object key
pub struct MemoryStore {
    pub objects: BTreeMap<String, Vec<u8>>,
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn download(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        self.objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}

/// In-memory tracking store: bare bag names awaiting ingest
pub struct MemoryTracking {
    pub pending: Mutex<Vec<String>>,
    pub recorded: Mutex<Vec<(String, String, bool)>>,
}

impl MemoryTracking {
    pub fn with_pending(bags: &[&str]) -> Self {
        Self {
            pending: Mutex::new(bags.iter().map(|b| b.to_string()).collect()),
            recorded: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TrackingStore for MemoryTracking {
    async fn digitized_not_ingested(&self, mmsids: &[String]) -> Result<Vec<String>, StoreError> {
        Ok(self
            .pending
            .lock()
            .unwrap()
            .iter()
            .filter(|bag| mmsids.iter().any(|m| bag.ends_with(m.as_str())))
            .cloned()
            .collect())
    }

    async fn update_ingest_status(
        &self,
        bag: &str,
        url: &str,
        ingested: bool,
    ) -> Result<(), StoreError> {
        self.recorded
            .lock()
            .unwrap()
            .push((bag.to_string(), url.to_string(), ingested));
        // Mirror the real store's exclusion filter: once marked ingested,
        // a bag no longer turns up as a discovery candidate
        if ingested {
            let bare = bag.split_once('/').map(|(_, b)| b).unwrap_or(bag);
            self.pending.lock().unwrap().retain(|b| b != bare);
        }
        Ok(())
    }
}

/// In-memory digitization request queue
pub struct MemoryQueue {
    pub requests: Vec<DigitizationRequest>,
}

impl MemoryQueue {
    pub fn empty() -> Self {
        Self { requests: vec![] }
    }

    pub fn with_mmsids(mmsids: &[&str]) -> Self {
        Self {
            requests: mmsids
                .iter()
                .map(|m| DigitizationRequest {
                    mmsid: m.to_string(),
                    name: String::new(),
                    email: String::new(),
                    title: String::new(),
                    creator: String::new(),
                    year: String::new(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl RequestQueue for MemoryQueue {
    async fn requested_mmsids(&self) -> Result<Vec<String>, StoreError> {
        let mut mmsids: Vec<String> = self.requests.iter().map(|r| r.mmsid.clone()).collect();
        mmsids.sort();
        mmsids.dedup();
        Ok(mmsids)
    }

    async fn requests_for(&self, mmsid: &str) -> Result<Vec<DigitizationRequest>, StoreError> {
        Ok(self
            .requests
            .iter()
            .filter(|r| r.mmsid == mmsid)
            .cloned()
            .collect())
    }
}

/// Settings wired for tests; the import command points at a fake script
pub fn test_settings(import_command: &Path) -> Settings {
    Settings {
        catalog: CatalogSettings {
            base_url: "https://api.example.edu/almaws/v1".to_string(),
            read_key: "ro".to_string(),
            write_key: "rw".to_string(),
        },
        storage: StorageSettings {
            bucket: "ul-bagit".to_string(),
            source: "shareok".to_string(),
            endpoint: None,
        },
        tracking: TrackingSettings {
            base_url: "https://cc.example.edu/api/catalog".to_string(),
            token: None,
            application: "dspace".to_string(),
        },
        repository: RepositorySettings {
            import_command: import_command.to_string_lossy().into_owned(),
            eperson: "libir@example.edu".to_string(),
            fqdn: "https://shareok.org".to_string(),
            staging_owner: None,
        },
        classifier: ClassifierSettings {
            default_org: "OU".to_string(),
            default_type: "THESIS".to_string(),
            organizations: HashMap::from([(
                "university of oklahoma".to_string(),
                "OU".to_string(),
            )]),
            collections: HashMap::from([
                ("OU_THESIS".to_string(), "11244/23528".to_string()),
                ("OU_DISSERTATION".to_string(), "11244/10476".to_string()),
            ]),
        },
    }
}

/// A bib record that passes the completeness gate
pub fn complete_bib(mmsid: &str) -> String {
    format!(
        r#"<bib><mms_id>{}</mms_id><record>
             <leader>00000nam a2200000 a 4500</leader>
             <controlfield tag="008">190315s2019    oku           000 0 eng d</controlfield>
             <datafield tag="245" ind1="1" ind2="0"><subfield code="a">A study of things.</subfield></datafield>
             <datafield tag="100" ind1="1" ind2=" "><subfield code="a">Smith, Jordan.</subfield></datafield>
             <datafield tag="260" ind1=" " ind2=" "><subfield code="c">2019.</subfield></datafield>
             <datafield tag="502" ind1=" " ind2=" "><subfield code="a">Thesis (M.S.)--University of Oklahoma, 2019.</subfield></datafield>
             <datafield tag="690" ind1=" " ind2=" "><subfield code="a">School of Civil Engineering.</subfield></datafield>
             <datafield tag="650" ind1=" " ind2="0"><subfield code="a">Hydrology.</subfield></datafield>
           </record></bib>"#,
        mmsid
    )
}

/// A bib record missing the degree statement and school
pub fn incomplete_bib(mmsid: &str) -> String {
    format!(
        r#"<bib><mms_id>{}</mms_id><record>
             <leader>00000nam a2200000 a 4500</leader>
             <datafield tag="245" ind1="1" ind2="0"><subfield code="a">A study of things.</subfield></datafield>
             <datafield tag="100" ind1="1" ind2=" "><subfield code="a">Smith, Jordan.</subfield></datafield>
             <datafield tag="260" ind1=" " ind2=" "><subfield code="c">2019.</subfield></datafield>
             <datafield tag="650" ind1=" " ind2="0"><subfield code="a">Hydrology.</subfield></datafield>
           </record></bib>"#,
        mmsid
    )
}

/// Object-store key for a file inside a bag's data directory
pub fn bag_key(bag: &str, name: &str) -> String {
    format!("private/shareok/{}/data/{}", bag, name)
}

/// Write an executable fake import script
///
/// The script records its `--source` path and `--collection` argument
/// (one per line) into `record`, then writes one accession map line per
/// staged item: `item_<n> 11244/90<n>`. With `succeed` false it records
/// the same and exits non-zero without a map.
pub fn write_import_script(dir: &Path, record: &Path, succeed: bool) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let tail = if succeed {
        r#"
for d in "$SRC"/item_*; do
  [ -d "$d" ] || continue
  n="${d##*_}"
  printf '%s 11244/90%s\n' "$(basename "$d")" "$n" >> "$MAPFILE"
done
exit 0
"#
    } else {
        r#"
echo "simulated import failure" >&2
exit 1
"#
    };

    let script = format!(
        r#"#!/bin/sh
SRC=""
MAPFILE=""
COLLECTION=""
while [ $# -gt 0 ]; do
  case "$1" in
    --source) SRC="$2"; shift ;;
    --mapfile) MAPFILE="$2"; shift ;;
    --collection) COLLECTION="$2"; shift ;;
  esac
  shift
done
printf '%s\n%s\n' "$SRC" "$COLLECTION" > "{record}"
{tail}"#,
        record = record.display(),
        tail = tail
    );

    let path = dir.join("fake-import.sh");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(script.as_bytes()).unwrap();
    file.flush().unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Read back what the fake import script recorded: (source dir, collection)
pub fn read_script_record(record: &Path) -> (String, String) {
    let content = std::fs::read_to_string(record).unwrap();
    let mut lines = content.lines();
    (
        lines.next().unwrap_or_default().to_string(),
        lines.next().unwrap_or_default().to_string(),
    )
}
