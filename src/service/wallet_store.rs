//! 钱包文件读写与地址查找
//!
//! 文件在生成/扫描时一次性写出，之后只读；
//! 多进程并发写不在引擎内协调，单写者纪律由外围系统保证

use std::path::Path;

use crate::domain::account::{WalletEntry, WalletFile};
use crate::error::WalletError;

pub struct WalletStore;

impl WalletStore {
    /// 写出钱包文件（pretty JSON，便于人工检查）
    pub fn save(path: &Path, file: &WalletFile) -> Result<(), WalletError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(file)
            .map_err(|e| WalletError::Store(format!("Serialization failed: {}", e)))?;
        std::fs::write(path, json)?;

        tracing::info!(
            path = %path.display(),
            addresses = file.total_addresses,
            "Wallet file written"
        );
        Ok(())
    }

    /// 读取钱包文件；缺失或损坏报 Store 错误，由调用方决定如何呈现
    pub fn load(path: &Path) -> Result<WalletFile, WalletError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WalletError::Store(format!("Cannot read wallet file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            WalletError::Store(format!(
                "Wallet file {} is corrupt: {}",
                path.display(),
                e
            ))
        })
    }

    /// 地址查找（大小写不敏感、两侧去空白）
    pub fn find_address<'a>(file: &'a WalletFile, query: &str) -> Option<&'a WalletEntry> {
        let needle = query.trim().to_lowercase();
        file.addresses
            .iter()
            .find(|entry| entry.account.address.trim().to_lowercase() == needle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::DerivedAccount;

    fn entry(index: u32, address: &str) -> WalletEntry {
        DerivedAccount {
            index,
            address: address.to_string(),
            private_key: format!("{:064x}", index),
            derivation_path: format!("m/44'/60'/0'/0/{}", index),
            imported: false,
        }
        .into()
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallets/eth_wallets.json");

        let file = WalletFile::new(
            "Ethereum",
            "eth_wallets",
            "mainnet",
            (0..10).map(|i| entry(i, &format!("0xAbC{:037x}", i))).collect(),
        );
        WalletStore::save(&path, &file).unwrap();

        let loaded = WalletStore::load(&path).unwrap();
        assert_eq!(loaded.total_addresses, 10);
        assert_eq!(loaded.network, "mainnet");
        for (a, b) in file.addresses.iter().zip(&loaded.addresses) {
            assert_eq!(a.account.address, b.account.address);
            assert_eq!(a.account.private_key, b.account.private_key);
            assert_eq!(a.account.derivation_path, b.account.derivation_path);
        }
    }

    #[test]
    fn test_find_case_insensitive() {
        let file = WalletFile::new(
            "Ethereum",
            "eth_wallets",
            "mainnet",
            vec![entry(0, "0xAbCdEf0000000000000000000000000000000001")],
        );

        let hit = WalletStore::find_address(&file, " 0XABCDEF0000000000000000000000000000000001 ");
        assert!(hit.is_some());
        assert_eq!(hit.unwrap().account.index, 0);

        assert!(WalletStore::find_address(&file, "0xmissing").is_none());
    }

    #[test]
    fn test_load_missing_or_corrupt() {
        let dir = tempfile::tempdir().unwrap();

        let missing = WalletStore::load(&dir.path().join("nope.json"));
        assert!(matches!(missing, Err(WalletError::Store(_))));

        let corrupt_path = dir.path().join("bad.json");
        std::fs::write(&corrupt_path, "{ not json").unwrap();
        assert!(matches!(
            WalletStore::load(&corrupt_path),
            Err(WalletError::Store(_))
        ));
    }
}
