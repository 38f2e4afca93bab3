use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // Data source configuration
    pub data_source_mode: DataSourceMode,
    pub directory_url: String,
    pub headless: bool,
    pub pages_directory: Option<String>,
    // Organization list (sponsors without location rows)
    pub include_organizations: bool,
    pub organizations_source: String,
    pub on_malformed_organization: MalformedPolicy,
    // Output
    pub output_directory: Option<String>,
    pub output_file: Option<String>,
    pub timeouts: Timeouts,
    pub selectors: Selectors,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSourceMode {
    #[serde(rename = "browser")]
    Browser,
    #[serde(rename = "saved")]
    Saved,
}

/// What to do with an organization segment whose labels don't line up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MalformedPolicy {
    #[serde(rename = "skip")]
    Skip,
    #[serde(rename = "abort")]
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub page_load_secs: u64,
    pub search_secs: u64,
    pub navigation_secs: u64,
    pub poll_interval_ms: u64,
    pub request_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    pub search_input: String,
    pub table: String,
    pub next_button: String,
    pub info: String,
    pub disabled_class: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_source_mode: DataSourceMode::Browser,
            directory_url: "https://skillbridge.osd.mil/locations.htm".to_string(),
            headless: true,
            pages_directory: Some("pages".to_string()),
            include_organizations: true,
            organizations_source: "https://skillbridge.osd.mil/js/organizations.js".to_string(),
            on_malformed_organization: MalformedPolicy::Skip,
            output_directory: Some("output".to_string()),
            output_file: None,
            timeouts: Timeouts::default(),
            selectors: Selectors::default(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            page_load_secs: 30,
            search_secs: 60,
            navigation_secs: 30,
            poll_interval_ms: 250,
            request_secs: 30,
        }
    }
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            search_input: "#keywords".to_string(),
            table: "#location-table".to_string(),
            next_button: "#location-table_next".to_string(),
            info: ".dataTables_info".to_string(),
            disabled_class: "disabled".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }
}

/// Output header, in column order.
pub const COLUMNS: [&str; 21] = [
    "Partner/Program",
    "Service",
    "City",
    "State",
    "Zip",
    "Duration of Training",
    "Employer POC",
    "POC Email",
    "Cost",
    "Closest Installation",
    "Op by State",
    "Delivery Method",
    "Target MOCs",
    "Other (Pre-Req?)",
    "Other (Eligibility?)",
    "Job Description",
    "Summary Description",
    "Job Family",
    "MOU Organization",
    "Lat",
    "Long",
];

/// Columns that come from the directory table itself (everything but Lat/Long).
pub const TABLE_COLUMNS: usize = 19;

/// One output row. Field order matches `COLUMNS`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "Partner/Program")]
    pub partner_program: String,
    #[serde(rename = "Service")]
    pub service: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Zip")]
    pub zip: String,
    #[serde(rename = "Duration of Training")]
    pub duration: String,
    #[serde(rename = "Employer POC")]
    pub employer_poc: String,
    #[serde(rename = "POC Email")]
    pub poc_email: String,
    #[serde(rename = "Cost")]
    pub cost: String,
    #[serde(rename = "Closest Installation")]
    pub closest_installation: String,
    #[serde(rename = "Op by State")]
    pub op_by_state: String,
    #[serde(rename = "Delivery Method")]
    pub delivery_method: String,
    #[serde(rename = "Target MOCs")]
    pub target_mocs: String,
    #[serde(rename = "Other (Pre-Req?)")]
    pub other_prereq: String,
    #[serde(rename = "Other (Eligibility?)")]
    pub other_eligibility: String,
    #[serde(rename = "Job Description")]
    pub job_description: String,
    #[serde(rename = "Summary Description")]
    pub summary_description: String,
    #[serde(rename = "Job Family")]
    pub job_family: String,
    #[serde(rename = "MOU Organization")]
    pub mou_organization: String,
    #[serde(rename = "Lat")]
    pub lat: String,
    #[serde(rename = "Long")]
    pub long: String,
}

impl Record {
    /// Build a record positionally from exactly one value per column.
    pub fn from_columns(columns: [String; 21]) -> Self {
        let [partner_program, service, city, state, zip, duration, employer_poc, poc_email, cost, closest_installation, op_by_state, delivery_method, target_mocs, other_prereq, other_eligibility, job_description, summary_description, job_family, mou_organization, lat, long] =
            columns;

        Self {
            partner_program,
            service,
            city,
            state,
            zip,
            duration,
            employer_poc,
            poc_email,
            cost,
            closest_installation,
            op_by_state,
            delivery_method,
            target_mocs,
            other_prereq,
            other_eligibility,
            job_description,
            summary_description,
            job_family,
            mou_organization,
            lat,
            long,
        }
    }

    pub fn columns(&self) -> [&str; 21] {
        [
            &self.partner_program,
            &self.service,
            &self.city,
            &self.state,
            &self.zip,
            &self.duration,
            &self.employer_poc,
            &self.poc_email,
            &self.cost,
            &self.closest_installation,
            &self.op_by_state,
            &self.delivery_method,
            &self.target_mocs,
            &self.other_prereq,
            &self.other_eligibility,
            &self.job_description,
            &self.summary_description,
            &self.job_family,
            &self.mou_organization,
            &self.lat,
            &self.long,
        ]
    }
}

/// Everything collected during one run, in insertion order.
///
/// Directory rows and organization rows are kept apart so the directory
/// count can be checked against the total the site reports; iteration
/// yields all directory rows first, then organization rows.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    directory: Vec<Record>,
    organizations: Vec<Record>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_directory(&mut self, record: Record) {
        self.directory.push(record);
    }

    pub fn push_organization(&mut self, record: Record) {
        self.organizations.push(record);
    }

    pub fn directory_count(&self) -> usize {
        self.directory.len()
    }

    pub fn organization_count(&self) -> usize {
        self.organizations.len()
    }

    pub fn len(&self) -> usize {
        self.directory.len() + self.organizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.directory.iter().chain(self.organizations.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered() -> [String; 21] {
        std::array::from_fn(|i| format!("v{}", i))
    }

    #[test]
    fn columns_follow_header_order() {
        let record = Record::from_columns(numbered());
        assert_eq!(record.partner_program, "v0");
        assert_eq!(record.zip, "v4");
        assert_eq!(record.job_family, "v17");
        assert_eq!(record.long, "v20");

        let columns = record.columns();
        for (i, value) in columns.iter().enumerate() {
            assert_eq!(*value, format!("v{}", i));
        }
    }

    #[test]
    fn result_set_keeps_directory_rows_before_organizations() {
        let mut results = ResultSet::new();
        let mut org = Record::default();
        org.partner_program = "org".to_string();
        let mut first = Record::default();
        first.partner_program = "first".to_string();
        let mut second = Record::default();
        second.partner_program = "second".to_string();

        results.push_organization(org);
        results.push_directory(first);
        results.push_directory(second);

        let names: Vec<_> = results.iter().map(|r| r.partner_program.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "org"]);
        assert_eq!(results.directory_count(), 2);
        assert_eq!(results.organization_count(), 1);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn config_survives_toml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.data_source_mode = DataSourceMode::Saved;
        config.on_malformed_organization = MalformedPolicy::Abort;
        config.timeouts.navigation_secs = 5;
        config.save_to_file(path).unwrap();

        let loaded = Config::load_from_file(path).unwrap();
        assert_eq!(loaded.data_source_mode, DataSourceMode::Saved);
        assert_eq!(loaded.on_malformed_organization, MalformedPolicy::Abort);
        assert_eq!(loaded.timeouts.navigation_secs, 5);
        assert_eq!(loaded.selectors.next_button, "#location-table_next");
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config: Config = toml::from_str("headless = false\n[timeouts]\nsearch_secs = 90\n").unwrap();
        assert!(!config.headless);
        assert_eq!(config.timeouts.search_secs, 90);
        assert_eq!(config.timeouts.poll_interval_ms, 250);
        assert_eq!(config.data_source_mode, DataSourceMode::Browser);
    }
}
