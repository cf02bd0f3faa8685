use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use swisstax_core::{
    CantonCode, CantonTaxYear, ChurchTaxConfig, ChurchTaxMethod, ChurchTaxRate, CivilStatus,
    DeductionBase, DeductionRule, Degression, Denomination, Eligibility, IncomeTaxBracket,
    Jurisdiction, MultiplierConvention, MultiplierSplit, Municipality, RateRepository,
    RateStructureKind, RepositoryError, RoundingMethod, StandardDeduction, TariffGroup, TaxBase,
    ThresholdGate, WealthRates, WealthSchedule, WealthTaxBracket, WealthTaxProportional,
    WealthTaxThreshold,
};
use tracing::{debug, info};

use crate::decimal::{decimal_to_text, get_decimal, get_optional_decimal};

pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(&connection_url(database_url))
            .await
            .with_context(|| format!("Failed to connect to database: {database_url}"))?;
        Ok(Self { pool })
    }

    pub async fn new_with_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Load and execute all SQL seed files from the specified directory.
    /// Files are executed in alphabetical order by filename.
    pub async fn run_seeds(
        &self,
        seeds_dir: &Path,
    ) -> Result<()> {
        let mut entries: Vec<_> = std::fs::read_dir(seeds_dir)
            .with_context(|| format!("Failed to read seeds directory '{}'", seeds_dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "sql"))
            .collect();

        entries.sort_by_key(|entry| entry.file_name());

        for entry in &entries {
            let path = entry.path();
            let sql = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read seed file '{}'", path.display()))?;

            sqlx::raw_sql(&sql)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to execute seed file '{}'", path.display()))?;
            debug!(file = %path.display(), "seed applied");
        }

        info!(files = entries.len(), dir = %seeds_dir.display(), "seeds applied");
        Ok(())
    }

    /// True once any jurisdiction year has been configured.
    pub async fn has_reference_data(&self) -> Result<bool> {
        let configured: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM canton_tax_year")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count configured jurisdictions")?;
        Ok(configured > 0)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Accepts bare paths and `:memory:` as well as sqlx URLs. Bare paths are
/// opened read-write and created if missing.
fn connection_url(connection_string: &str) -> String {
    match connection_string {
        ":memory:" => "sqlite::memory:".to_string(),
        s if s.starts_with("sqlite:") => s.to_string(),
        path => format!("sqlite:{path}?mode=rwc"),
    }
}

fn db_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn column<'r, T>(
    row: &'r SqliteRow,
    name: &str,
) -> Result<T, RepositoryError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| RepositoryError::Database(format!("Failed to get '{name}': {e}")))
}

/// Reads a text code column and parses it with `parse`.
fn code<T>(
    row: &SqliteRow,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<T, RepositoryError> {
    let raw: String = column(row, name)?;
    parse(&raw)
        .ok_or_else(|| RepositoryError::Database(format!("Invalid {name} code: {raw}")))
}

fn optional_code<T>(
    row: &SqliteRow,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, RepositoryError> {
    let raw: Option<String> = column(row, name)?;
    raw.map(|raw| {
        parse(&raw).ok_or_else(|| RepositoryError::Database(format!("Invalid {name} code: {raw}")))
    })
    .transpose()
}

/// Comma-separated code list; blank entries are skipped.
fn code_list<T>(
    row: &SqliteRow,
    name: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Vec<T>, RepositoryError> {
    let raw: String = column(row, name)?;
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            parse(s).ok_or_else(|| RepositoryError::Database(format!("Invalid {name} entry: {s}")))
        })
        .collect()
}

fn flag(
    row: &SqliteRow,
    name: &str,
) -> Result<bool, RepositoryError> {
    Ok(column::<i64>(row, name)? != 0)
}

fn required<T>(
    value: Option<T>,
    code: &str,
    name: &str,
) -> Result<T, RepositoryError> {
    value.ok_or_else(|| {
        RepositoryError::Database(format!("Deduction '{code}' is missing column '{name}'"))
    })
}

fn row_to_canton_tax_year(row: &SqliteRow) -> Result<CantonTaxYear, RepositoryError> {
    Ok(CantonTaxYear {
        jurisdiction: code(row, "jurisdiction", Jurisdiction::parse)?,
        tax_year: column(row, "tax_year")?,
        rate_structure: code(row, "rate_structure", RateStructureKind::parse)?,
        multiplier_convention: code(row, "multiplier_convention", MultiplierConvention::parse)?,
        canton_multiplier: get_decimal(row, "canton_multiplier")?,
        has_municipal_multiplier: flag(row, "has_municipal_multiplier")?,
        multiplier_split: code(row, "multiplier_split", MultiplierSplit::parse)?,
        rounding: code(row, "rounding", RoundingMethod::parse)?,
        splitting_divisor: get_optional_decimal(row, "splitting_divisor")?,
        max_average_rate: get_optional_decimal(row, "max_average_rate")?,
        base_truncation: get_optional_decimal(row, "base_truncation")?,
    })
}

fn row_to_income_bracket(row: &SqliteRow) -> Result<IncomeTaxBracket, RepositoryError> {
    Ok(IncomeTaxBracket {
        jurisdiction: code(row, "jurisdiction", Jurisdiction::parse)?,
        tax_year: column(row, "tax_year")?,
        tariff: code(row, "tariff", TariffGroup::parse)?,
        lower_bound: get_decimal(row, "lower_bound")?,
        upper_bound: get_optional_decimal(row, "upper_bound")?,
        rate: get_decimal(row, "rate")?,
        ordering: column(row, "ordering")?,
    })
}

fn row_to_municipality(row: &SqliteRow) -> Result<Municipality, RepositoryError> {
    Ok(Municipality {
        canton: code(row, "canton", CantonCode::parse)?,
        tax_year: column(row, "tax_year")?,
        name: column(row, "name")?,
        bfs_number: column(row, "bfs_number")?,
        tax_multiplier: get_decimal(row, "tax_multiplier")?,
        canton_share: get_optional_decimal(row, "canton_share")?,
    })
}

fn row_to_church_rate(row: &SqliteRow) -> Result<ChurchTaxRate, RepositoryError> {
    Ok(ChurchTaxRate {
        canton: code(row, "canton", CantonCode::parse)?,
        municipality: column(row, "municipality")?,
        denomination: code(row, "denomination", Denomination::parse)?,
        tax_year: column(row, "tax_year")?,
        rate: get_decimal(row, "rate")?,
        district_rate: get_optional_decimal(row, "district_rate")?,
    })
}

fn row_to_deduction(row: &SqliteRow) -> Result<StandardDeduction, RepositoryError> {
    let deduction_code: String = column(row, "code")?;
    let kind: String = column(row, "rule_kind")?;
    let dec = |name: &str| get_optional_decimal(row, name);
    let dc = deduction_code.as_str();

    let rule = match kind.as_str() {
        "fixed" => DeductionRule::Fixed {
            amount: required(dec("amount")?, dc, "amount")?,
            per_child: flag(row, "per_child")?,
        },
        "percentage_capped" => DeductionRule::PercentageCapped {
            base: required(optional_code(row, "base", DeductionBase::parse)?, dc, "base")?,
            percentage: required(dec("percentage")?, dc, "percentage")?,
            min_amount: dec("min_amount")?.unwrap_or_default(),
            max_amount: required(dec("max_amount")?, dc, "max_amount")?,
        },
        "threshold_gated" => {
            let degression = match dec("degression_step")? {
                Some(step) => Some(Degression {
                    step,
                    reduction_per_step: required(
                        dec("degression_reduction")?,
                        dc,
                        "degression_reduction",
                    )?,
                    floor: dec("degression_floor")?.unwrap_or_default(),
                }),
                None => None,
            };
            DeductionRule::ThresholdGated {
                gate: required(optional_code(row, "gate", ThresholdGate::parse)?, dc, "gate")?,
                threshold: required(dec("threshold")?, dc, "threshold")?,
                amount: required(dec("amount")?, dc, "amount")?,
                degression,
            }
        }
        other => {
            return Err(RepositoryError::Database(format!(
                "Invalid rule_kind code: {other}"
            )));
        }
    };

    let min_children: i64 = column(row, "min_children")?;
    Ok(StandardDeduction {
        jurisdiction: code(row, "jurisdiction", Jurisdiction::parse)?,
        tax_year: column(row, "tax_year")?,
        target: code(row, "target", TaxBase::parse)?,
        rule,
        eligibility: Eligibility {
            civil_statuses: code_list(row, "civil_statuses", CivilStatus::parse)?,
            min_children: u32::try_from(min_children).map_err(|_| {
                RepositoryError::Database(format!("Invalid min_children: {min_children}"))
            })?,
            requires_claim: flag(row, "requires_claim")?,
        },
        requires: column(row, "requires")?,
        ordering: column(row, "ordering")?,
        code: deduction_code,
    })
}

const CANTON_TAX_YEAR_COLUMNS: &str = "jurisdiction, tax_year, rate_structure, multiplier_convention,
    canton_multiplier, has_municipal_multiplier, multiplier_split, rounding,
    splitting_divisor, max_average_rate, base_truncation";

const MUNICIPALITY_COLUMNS: &str =
    "canton, tax_year, name, bfs_number, tax_multiplier, canton_share";

const CHURCH_RATE_COLUMNS: &str =
    "canton, municipality, denomination, tax_year, rate, district_rate";

#[async_trait]
impl RateRepository for SqliteRepository {
    async fn get_canton_tax_year(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<CantonTaxYear, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CANTON_TAX_YEAR_COLUMNS} FROM canton_tax_year
             WHERE jurisdiction = ? AND tax_year = ?"
        ))
        .bind(jurisdiction.as_str())
        .bind(tax_year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_canton_tax_year(&row)
    }

    async fn list_jurisdictions(
        &self,
        tax_year: i32,
    ) -> Result<Vec<Jurisdiction>, RepositoryError> {
        let rows = sqlx::query("SELECT jurisdiction FROM canton_tax_year WHERE tax_year = ?")
            .bind(tax_year)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut jurisdictions = rows
            .iter()
            .map(|row| code(row, "jurisdiction", Jurisdiction::parse))
            .collect::<Result<Vec<_>, _>>()?;
        jurisdictions.sort();
        Ok(jurisdictions)
    }

    async fn list_tax_years(&self) -> Result<Vec<i32>, RepositoryError> {
        let rows =
            sqlx::query("SELECT DISTINCT tax_year FROM canton_tax_year ORDER BY tax_year DESC")
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        rows.iter().map(|row| column(row, "tax_year")).collect()
    }

    async fn get_income_brackets(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
        tariff: TariffGroup,
    ) -> Result<Vec<IncomeTaxBracket>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT jurisdiction, tax_year, tariff, lower_bound, upper_bound, rate, ordering
             FROM income_tax_brackets
             WHERE jurisdiction = ? AND tax_year = ? AND tariff = ?
             ORDER BY ordering",
        )
        .bind(jurisdiction.as_str())
        .bind(tax_year)
        .bind(tariff.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        if rows.is_empty() {
            return Err(RepositoryError::NotFound);
        }
        rows.iter().map(row_to_income_bracket).collect()
    }

    async fn insert_income_bracket(
        &self,
        bracket: &IncomeTaxBracket,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO income_tax_brackets
                (jurisdiction, tax_year, tariff, lower_bound, upper_bound, rate, ordering)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(bracket.jurisdiction.as_str())
        .bind(bracket.tax_year)
        .bind(bracket.tariff.as_str())
        .bind(decimal_to_text(bracket.lower_bound))
        .bind(bracket.upper_bound.map(decimal_to_text))
        .bind(decimal_to_text(bracket.rate))
        .bind(bracket.ordering)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn delete_income_brackets(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
        tariff: TariffGroup,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "DELETE FROM income_tax_brackets
             WHERE jurisdiction = ? AND tax_year = ? AND tariff = ?",
        )
        .bind(jurisdiction.as_str())
        .bind(tax_year)
        .bind(tariff.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn get_wealth_schedule(
        &self,
        canton: CantonCode,
        tax_year: i32,
    ) -> Result<WealthSchedule, RepositoryError> {
        let threshold_rows = sqlx::query(
            "SELECT tariff, tax_free_amount FROM wealth_tax_thresholds
             WHERE canton = ? AND tax_year = ? ORDER BY tariff",
        )
        .bind(canton.as_str())
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let thresholds = threshold_rows
            .iter()
            .map(|row| -> Result<_, RepositoryError> {
                Ok(WealthTaxThreshold {
                    canton,
                    tax_year,
                    tariff: code(row, "tariff", TariffGroup::parse)?,
                    tax_free_amount: get_decimal(row, "tax_free_amount")?,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        let proportional = sqlx::query(
            "SELECT rate_per_mille FROM wealth_tax_proportional WHERE canton = ? AND tax_year = ?",
        )
        .bind(canton.as_str())
        .bind(tax_year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        let rates = match proportional {
            Some(row) => WealthRates::Proportional(WealthTaxProportional {
                canton,
                tax_year,
                rate_per_mille: get_decimal(&row, "rate_per_mille")?,
            }),
            None => {
                let rows = sqlx::query(
                    "SELECT lower_bound, upper_bound, rate_per_mille, ordering
                     FROM wealth_tax_brackets
                     WHERE canton = ? AND tax_year = ?
                     ORDER BY ordering",
                )
                .bind(canton.as_str())
                .bind(tax_year)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

                if rows.is_empty() {
                    return Err(RepositoryError::NotFound);
                }
                WealthRates::Brackets(
                    rows.iter()
                        .map(|row| -> Result<_, RepositoryError> {
                            Ok(WealthTaxBracket {
                                canton,
                                tax_year,
                                lower_bound: get_decimal(row, "lower_bound")?,
                                upper_bound: get_optional_decimal(row, "upper_bound")?,
                                rate_per_mille: get_decimal(row, "rate_per_mille")?,
                                ordering: column(row, "ordering")?,
                            })
                        })
                        .collect::<Result<Vec<_>, RepositoryError>>()?,
                )
            }
        };

        Ok(WealthSchedule {
            canton,
            tax_year,
            thresholds,
            rates,
        })
    }

    async fn get_municipality(
        &self,
        canton: CantonCode,
        name: &str,
        tax_year: i32,
    ) -> Result<Municipality, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {MUNICIPALITY_COLUMNS} FROM municipalities
             WHERE canton = ? AND name = ? AND tax_year = ?"
        ))
        .bind(canton.as_str())
        .bind(name.trim())
        .bind(tax_year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_municipality(&row)
    }

    async fn list_municipalities(
        &self,
        canton: CantonCode,
        tax_year: i32,
    ) -> Result<Vec<Municipality>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {MUNICIPALITY_COLUMNS} FROM municipalities
             WHERE canton = ? AND tax_year = ? ORDER BY name"
        ))
        .bind(canton.as_str())
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_municipality).collect()
    }

    async fn insert_municipality(
        &self,
        municipality: &Municipality,
    ) -> Result<(), RepositoryError> {
        sqlx::query(&format!(
            "INSERT OR REPLACE INTO municipalities ({MUNICIPALITY_COLUMNS})
             VALUES (?, ?, ?, ?, ?, ?)"
        ))
        .bind(municipality.canton.as_str())
        .bind(municipality.tax_year)
        .bind(&municipality.name)
        .bind(municipality.bfs_number)
        .bind(decimal_to_text(municipality.tax_multiplier))
        .bind(municipality.canton_share.map(decimal_to_text))
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(())
    }

    async fn delete_municipalities(
        &self,
        canton: CantonCode,
        tax_year: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM municipalities WHERE canton = ? AND tax_year = ?")
            .bind(canton.as_str())
            .bind(tax_year)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(())
    }

    async fn get_church_tax_config(
        &self,
        canton: CantonCode,
    ) -> Result<ChurchTaxConfig, RepositoryError> {
        let row = sqlx::query(
            "SELECT canton, has_church_tax, recognized_denominations, method
             FROM church_tax_config WHERE canton = ?",
        )
        .bind(canton.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        Ok(ChurchTaxConfig {
            canton: code(&row, "canton", CantonCode::parse)?,
            has_church_tax: flag(&row, "has_church_tax")?,
            recognized_denominations: code_list(
                &row,
                "recognized_denominations",
                Denomination::parse,
            )?,
            method: code(&row, "method", ChurchTaxMethod::parse)?,
        })
    }

    async fn get_church_rate(
        &self,
        canton: CantonCode,
        municipality: &str,
        denomination: Denomination,
        tax_year: i32,
    ) -> Result<ChurchTaxRate, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {CHURCH_RATE_COLUMNS} FROM church_tax_rates
             WHERE canton = ? AND municipality = ? AND denomination = ? AND tax_year = ?"
        ))
        .bind(canton.as_str())
        .bind(municipality.trim())
        .bind(denomination.as_str())
        .bind(tax_year)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .ok_or(RepositoryError::NotFound)?;

        row_to_church_rate(&row)
    }

    async fn list_church_rates(
        &self,
        canton: CantonCode,
        tax_year: i32,
    ) -> Result<Vec<ChurchTaxRate>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {CHURCH_RATE_COLUMNS} FROM church_tax_rates
             WHERE canton = ? AND tax_year = ? ORDER BY municipality, denomination"
        ))
        .bind(canton.as_str())
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_church_rate).collect()
    }

    async fn get_deductions(
        &self,
        jurisdiction: Jurisdiction,
        tax_year: i32,
    ) -> Result<Vec<StandardDeduction>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT jurisdiction, tax_year, code, target, rule_kind, amount, per_child, base,
                    percentage, min_amount, max_amount, gate, threshold, degression_step,
                    degression_reduction, degression_floor, civil_statuses, min_children,
                    requires_claim, requires, ordering
             FROM standard_deductions
             WHERE jurisdiction = ? AND tax_year = ?
             ORDER BY ordering",
        )
        .bind(jurisdiction.as_str())
        .bind(tax_year)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.iter().map(row_to_deduction).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn setup_test_db() -> SqliteRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");

        let repo = SqliteRepository::new_with_pool(pool).await;
        repo.run_migrations()
            .await
            .expect("Failed to run migrations");
        repo
    }

    async fn seeded_db() -> SqliteRepository {
        let repo = setup_test_db().await;
        repo.run_seeds(&PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds"))
            .await
            .expect("Failed to run seeds");
        repo
    }

    fn zh() -> Jurisdiction {
        Jurisdiction::Canton(CantonCode::ZH)
    }

    #[test]
    fn test_connection_url_forms() {
        assert_eq!(connection_url(":memory:"), "sqlite::memory:");
        assert_eq!(connection_url("sqlite:rates.db"), "sqlite:rates.db");
        assert_eq!(connection_url("rates.db"), "sqlite:rates.db?mode=rwc");
    }

    #[tokio::test]
    async fn test_get_canton_tax_year() {
        let repo = seeded_db().await;

        let config = repo
            .get_canton_tax_year(Jurisdiction::Canton(CantonCode::BS), 2024)
            .await
            .expect("BS 2024 is seeded");

        assert_eq!(config.rate_structure, RateStructureKind::FlatPerBracket);
        assert_eq!(config.multiplier_split, MultiplierSplit::CantonShareOverride);
        assert_eq!(config.canton_factor(), dec!(1));
    }

    #[tokio::test]
    async fn test_federal_configuration_carries_limits() {
        let repo = seeded_db().await;

        let config = repo
            .get_canton_tax_year(Jurisdiction::Federal, 2024)
            .await
            .expect("federal 2024 is seeded");

        assert_eq!(config.max_average_rate, Some(dec!(11.5)));
        assert_eq!(config.base_truncation, Some(dec!(100)));
        assert!(!config.has_municipal_multiplier);
    }

    #[tokio::test]
    async fn test_get_canton_tax_year_not_found() {
        let repo = seeded_db().await;

        let result = repo.get_canton_tax_year(zh(), 1999).await;

        assert_eq!(result, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_list_jurisdictions_puts_federal_first() {
        let repo = seeded_db().await;

        let jurisdictions = repo.list_jurisdictions(2024).await.expect("lists");

        assert_eq!(jurisdictions.first(), Some(&Jurisdiction::Federal));
        assert!(jurisdictions.contains(&zh()));
        assert_eq!(repo.list_tax_years().await, Ok(vec![2024]));
    }

    #[tokio::test]
    async fn test_get_income_brackets_ordered() {
        let repo = seeded_db().await;

        let brackets = repo
            .get_income_brackets(zh(), 2024, TariffGroup::Single)
            .await
            .expect("ZH single tariff is seeded");

        assert_eq!(brackets.first().map(|b| b.lower_bound), Some(dec!(0)));
        assert_eq!(brackets.last().map(|b| b.upper_bound), Some(None));
        assert!(brackets.windows(2).all(|w| w[0].upper_bound == Some(w[1].lower_bound)));
    }

    #[tokio::test]
    async fn test_get_income_brackets_empty_is_not_found() {
        let repo = setup_test_db().await;

        let result = repo.get_income_brackets(zh(), 2024, TariffGroup::Married).await;

        assert_eq!(result, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_insert_and_delete_income_brackets() {
        let repo = setup_test_db().await;
        let bracket = IncomeTaxBracket {
            jurisdiction: zh(),
            tax_year: 2025,
            tariff: TariffGroup::Single,
            lower_bound: dec!(0),
            upper_bound: None,
            rate: dec!(7.25),
            ordering: 1,
        };

        repo.insert_income_bracket(&bracket).await.expect("inserts");
        assert_eq!(
            repo.get_income_brackets(zh(), 2025, TariffGroup::Single).await,
            Ok(vec![bracket])
        );

        repo.delete_income_brackets(zh(), 2025, TariffGroup::Single)
            .await
            .expect("deletes");
        assert_eq!(
            repo.get_income_brackets(zh(), 2025, TariffGroup::Single).await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_wealth_schedule_brackets_and_proportional() {
        let repo = seeded_db().await;

        let zh_schedule = repo
            .get_wealth_schedule(CantonCode::ZH, 2024)
            .await
            .expect("ZH wealth is seeded");
        let bs_schedule = repo
            .get_wealth_schedule(CantonCode::BS, 2024)
            .await
            .expect("BS wealth is seeded");

        assert!(matches!(zh_schedule.rates, WealthRates::Brackets(ref b) if b.len() == 6));
        assert_eq!(zh_schedule.tax_free_amount(TariffGroup::Married), dec!(159000));
        assert!(matches!(
            bs_schedule.rates,
            WealthRates::Proportional(ref p) if p.rate_per_mille == dec!(4.5)
        ));
    }

    #[tokio::test]
    async fn test_wealth_schedule_not_found() {
        let repo = seeded_db().await;

        let result = repo.get_wealth_schedule(CantonCode::GE, 2024).await;

        assert_eq!(result, Err(RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_municipality_and_multiplier() {
        let repo = seeded_db().await;

        let riehen = repo
            .get_municipality(CantonCode::BS, "Riehen", 2024)
            .await
            .expect("Riehen is seeded");

        assert_eq!(riehen.canton_share, Some(dec!(0.5)));
        assert_eq!(riehen.bfs_number, Some(2703));
        assert_eq!(
            repo.get_municipal_multiplier(CantonCode::ZH, "Zürich", 2024).await,
            Ok((dec!(119), MultiplierConvention::Percentage))
        );
    }

    #[tokio::test]
    async fn test_insert_and_delete_municipalities() {
        let repo = setup_test_db().await;
        let uster = Municipality {
            canton: CantonCode::ZH,
            tax_year: 2025,
            name: "Uster".to_string(),
            bfs_number: Some(198),
            tax_multiplier: dec!(108),
            canton_share: None,
        };

        repo.insert_municipality(&uster).await.expect("inserts");
        repo.insert_municipality(&uster).await.expect("replaces");
        assert_eq!(
            repo.list_municipalities(CantonCode::ZH, 2025).await,
            Ok(vec![uster])
        );

        repo.delete_municipalities(CantonCode::ZH, 2025)
            .await
            .expect("deletes");
        assert_eq!(repo.list_municipalities(CantonCode::ZH, 2025).await, Ok(vec![]));
    }

    #[tokio::test]
    async fn test_church_tax_config_and_rates() {
        let repo = seeded_db().await;

        let config = repo
            .get_church_tax_config(CantonCode::LU)
            .await
            .expect("LU church config is seeded");
        let rate = repo
            .get_church_rate(CantonCode::LU, "Luzern", Denomination::RomanCatholic, 2024)
            .await
            .expect("Luzern catholic rate is seeded");

        assert_eq!(config.method, ChurchTaxMethod::DistrictAndParish);
        assert!(config.recognizes(Denomination::Protestant));
        assert!(!config.recognizes(Denomination::Jewish));
        assert_eq!(rate.district_rate, Some(dec!(0.0575)));
        assert_eq!(
            repo.get_church_rate(CantonCode::LU, "Luzern", Denomination::Jewish, 2024)
                .await,
            Err(RepositoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_get_deductions_decodes_every_rule_kind() {
        let repo = seeded_db().await;

        let deductions = repo
            .get_deductions(Jurisdiction::Canton(CantonCode::BS), 2024)
            .await
            .expect("BS deductions are seeded");

        let relief = deductions
            .iter()
            .find(|d| d.code == "low_income_relief")
            .expect("relief is seeded");
        assert_eq!(
            relief.rule,
            DeductionRule::ThresholdGated {
                gate: ThresholdGate::Below,
                threshold: dec!(60000),
                amount: dec!(2000),
                degression: Some(Degression {
                    step: dec!(1000),
                    reduction_per_step: dec!(100),
                    floor: dec!(0),
                }),
            }
        );

        let single_parent = deductions
            .iter()
            .find(|d| d.code == "single_parent")
            .expect("single parent deduction is seeded");
        assert_eq!(
            single_parent.eligibility.civil_statuses,
            vec![CivilStatus::SingleParent]
        );
        assert!(deductions.windows(2).all(|w| w[0].ordering <= w[1].ordering));
    }

    #[tokio::test]
    async fn test_dependent_deduction_is_decoded() {
        let repo = seeded_db().await;

        let deductions = repo
            .get_deductions(Jurisdiction::Federal, 2024)
            .await
            .expect("federal deductions are seeded");
        let childcare = deductions
            .iter()
            .find(|d| d.code == "childcare")
            .expect("childcare is seeded");

        assert_eq!(childcare.requires.as_deref(), Some("children"));
        assert!(childcare.eligibility.requires_claim);
        assert_eq!(childcare.eligibility.min_children, 1);
    }

    #[tokio::test]
    async fn test_run_seeds_is_repeatable() {
        let repo = seeded_db().await;

        repo.run_seeds(&PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("seeds"))
            .await
            .expect("second run succeeds");

        let brackets = repo
            .get_income_brackets(Jurisdiction::Federal, 2024, TariffGroup::Single)
            .await
            .expect("federal brackets");
        assert_eq!(brackets.len(), 10);
    }

    #[tokio::test]
    async fn test_run_seeds_nonexistent_directory() {
        let repo = setup_test_db().await;

        let result = repo.run_seeds(Path::new("/nonexistent/seeds")).await;

        assert!(result.is_err());
    }
}
