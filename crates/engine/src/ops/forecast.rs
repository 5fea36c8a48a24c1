use chrono::NaiveDate;
use sea_orm::prelude::Uuid;

use crate::{Forecast, ForecastCategory, ResultEngine, forecast};

use super::Engine;

impl Engine {
    /// Forecast the current month of a budget from its mirrored categories.
    pub async fn forecast_budget(
        &self,
        budget_id: Uuid,
        today: NaiveDate,
        alpha: f64,
    ) -> ResultEngine<Forecast> {
        self.budget(budget_id).await?;
        let categories = self.budget_categories(budget_id).await?;
        let inputs: Vec<ForecastCategory> = categories.iter().map(ForecastCategory::from).collect();
        Ok(forecast(&inputs, today, alpha))
    }
}
