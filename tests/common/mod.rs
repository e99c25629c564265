use std::path::{Path, PathBuf};

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa, KeyPair, KeyUsagePurpose,
};
use tempfile::TempDir;

const SCHEMA: &str = include_str!("../../migrations/sqlite/001_create_certificates.sql");

/// A throwaway CA with its PEM files written to a temporary directory.
pub struct TestCa {
    pub dir: TempDir,
    pub cert_pem: String,
    pub key_pem: String,
}

impl TestCa {
    pub fn new(name: &str) -> Self {
        let mut params = CertificateParams::default();
        let key_pair = KeyPair::generate().unwrap();

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, name);
        dn.push(DnType::OrganizationName, "Test Organization");
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];

        let cert = params.self_signed(&key_pair).unwrap();
        let ca = Self {
            dir: TempDir::new().unwrap(),
            cert_pem: cert.pem(),
            key_pem: key_pair.serialize_pem(),
        };
        std::fs::write(ca.cert_path(), &ca.cert_pem).unwrap();
        std::fs::write(ca.key_path(), &ca.key_pem).unwrap();
        ca
    }

    pub fn cert_path(&self) -> PathBuf {
        self.dir.path().join("ca.pem")
    }

    pub fn key_path(&self) -> PathBuf {
        self.dir.path().join("ca-key.pem")
    }

    /// Write `contents` next to the CA files and return the path.
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }
}

/// Create a migrated SQLite database and a JSON config pointing at it.
pub fn sqlite_with_config(dir: &Path) -> (PathBuf, PathBuf) {
    let db_path = dir.join("certstore_test.db");
    rusqlite::Connection::open(&db_path)
        .unwrap()
        .execute_batch(SCHEMA)
        .unwrap();

    let config = serde_json::json!({
        "driver": "sqlite3",
        "data_source": db_path.to_str().unwrap(),
    });
    let config_path = dir.join("sqlite_db.json");
    std::fs::write(&config_path, config.to_string()).unwrap();

    (db_path, config_path)
}
