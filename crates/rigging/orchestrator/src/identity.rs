//! Identity-to-principal binder
//!
//! Creates the database principal for the workload identity without reading
//! the directory. The principal is created with an explicit SID derived from
//! the identity's client id, then granted database-level read, write and
//! execute. Server-level roles are never touched.

use crate::scripts::{ImportOutcome, Script, ScriptImporter, ScriptKind};
use rigging_types::WorkloadIdentity;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Database roles granted to the workload identity
pub const GRANTED_ROLES: [&str; 2] = ["db_datareader", "db_datawriter"];

/// SID of an identity-bound database principal.
///
/// The engine stores the client id in its little-endian GUID layout; the SID
/// literal is that byte sequence in hex. Same GUID, same SID.
pub fn sid_from_client_id(client_id: &Uuid) -> String {
    format!("0x{}", hex::encode_upper(client_id.to_bytes_le()))
}

fn quote_identifier(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

fn quote_literal(value: &str) -> String {
    format!("N'{}'", value.replace('\'', "''"))
}

/// Drop-then-create script; safe to run any number of times
pub fn binding_script(identity: &WorkloadIdentity) -> String {
    let principal = quote_identifier(&identity.name);
    let literal = quote_literal(&identity.name);
    let sid = sid_from_client_id(&identity.client_id);

    let mut script = String::new();
    script.push_str(&format!(
        "IF EXISTS (SELECT 1 FROM sys.database_principals WHERE name = {literal})\n    DROP USER {principal};\n"
    ));
    script.push_str(&format!(
        "CREATE USER {principal} WITH SID = {sid}, TYPE = E;\n"
    ));
    for role in GRANTED_ROLES {
        script.push_str(&format!("ALTER ROLE {role} ADD MEMBER {principal};\n"));
    }
    script.push_str(&format!("GRANT EXECUTE TO {principal};\n"));
    script
}

/// Binds workload identities to database principals through the script channel
pub struct PrincipalBinder<'a, 'b> {
    importer: &'b ScriptImporter<'a>,
}

impl<'a, 'b> PrincipalBinder<'a, 'b> {
    pub fn new(importer: &'b ScriptImporter<'a>) -> Self {
        Self { importer }
    }

    #[instrument(skip(self, identity), fields(principal = %identity.name))]
    pub async fn bind(&self, identity: &WorkloadIdentity) -> ImportOutcome {
        let script = Script::new(
            format!("bind-{}", identity.name),
            ScriptKind::PrincipalBinding,
            binding_script(identity),
        );
        let outcome = self.importer.import(&script).await;
        if outcome.succeeded() {
            info!(sid = %sid_from_client_id(&identity.client_id), "Database principal bound");
        } else {
            warn!("Database principal could not be bound; rerun to retry");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::RecordingScriptRunner;
    use crate::scripts::{SqlAuthMethod, ScriptTarget};

    fn identity(name: &str) -> WorkloadIdentity {
        WorkloadIdentity {
            client_id: Uuid::parse_str("12345678-1234-1234-1234-123456789012").unwrap(),
            principal_id: Uuid::parse_str("87654321-4321-4321-4321-210987654321").unwrap(),
            name: name.into(),
        }
    }

    #[test]
    fn test_sid_reorders_first_three_groups() {
        let id = Uuid::parse_str("12345678-1234-1234-1234-123456789012").unwrap();
        assert_eq!(sid_from_client_id(&id), "0x78563412341234121234123456789012");
    }

    #[test]
    fn test_sid_is_deterministic() {
        let id = Uuid::parse_str("0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9").unwrap();
        let first = sid_from_client_id(&id);
        assert_eq!(first, sid_from_client_id(&id));
        assert_eq!(first, "0x3D2C1B0A5F4E71608293A4B5C6D7E8F9");
        assert_eq!(first.len(), 34);
    }

    #[test]
    fn test_script_drops_before_create_and_grants_database_roles() {
        let script = binding_script(&identity("mid-expenses"));

        let drop = script.find("DROP USER [mid-expenses]").unwrap();
        let create = script
            .find("CREATE USER [mid-expenses] WITH SID = 0x78563412341234121234123456789012, TYPE = E")
            .unwrap();
        assert!(drop < create);
        assert!(script.contains("ALTER ROLE db_datareader ADD MEMBER [mid-expenses]"));
        assert!(script.contains("ALTER ROLE db_datawriter ADD MEMBER [mid-expenses]"));
        assert!(script.contains("GRANT EXECUTE TO [mid-expenses]"));
        assert!(!script.to_lowercase().contains("sp_addsrvrolemember"));
        assert!(!script.contains("FROM EXTERNAL PROVIDER"));
    }

    #[test]
    fn test_names_are_escaped() {
        let script = binding_script(&identity("odd]name'x"));
        assert!(script.contains("[odd]]name'x]"));
        assert!(script.contains("N'odd]name''x'"));
    }

    #[tokio::test]
    async fn test_bind_runs_through_importer() {
        let runner = RecordingScriptRunner::new();
        let importer = ScriptImporter::new(
            &runner,
            ScriptTarget {
                server: "sql-x.database.windows.net".into(),
                database: "Northwind".into(),
                auth: SqlAuthMethod::CliToken,
            },
        );

        let outcome = PrincipalBinder::new(&importer)
            .bind(&identity("mid-expenses"))
            .await;

        assert!(outcome.succeeded());
        assert_eq!(outcome.kind, ScriptKind::PrincipalBinding);
        let runs = runner.runs();
        assert_eq!(runs.len(), 1);
        assert!(runs[0].content.contains("CREATE USER [mid-expenses]"));
    }
}
