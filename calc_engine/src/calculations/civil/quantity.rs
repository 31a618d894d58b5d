//! Concrete and reinforcement take-off with cost and embodied carbon from the
//! Material Database. Lower-carbon concrete grades of at least the same
//! strength are listed as alternatives.

use serde::{Deserialize, Serialize};

use super::{check_concrete_grade, check_steel_grade, default_steel_grade, CONCRETE_CATEGORY, REINFORCEMENT_CATEGORY};
use crate::calculations::{InputRecord, Outcome};
use crate::context::EngineContext;
use crate::errors::{EngineResult, FieldError};
use crate::validation::FieldChecks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberType {
    Slab,
    Beam,
    Column,
    Foundation,
    Wall,
    #[default]
    Other,
}

impl MemberType {
    /// Typical reinforcement rate (kg/m³)
    pub fn reinforcement_rate(&self) -> f64 {
        match self {
            MemberType::Slab => 90.0,
            MemberType::Beam => 150.0,
            MemberType::Column => 200.0,
            MemberType::Foundation => 80.0,
            MemberType::Wall => 100.0,
            MemberType::Other => 120.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberInput {
    pub name: String,
    #[serde(default)]
    pub member_type: MemberType,
    pub length_m: f64,
    pub width_m: f64,
    pub depth_m: f64,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    /// Overrides the member-type rate
    #[serde(default)]
    pub reinforcement_rate_kg_m3: Option<f64>,
}

fn default_quantity() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcreteQuantityInput {
    pub members: Vec<MemberInput>,
    pub concrete_grade: String,
    #[serde(default = "default_steel_grade")]
    pub steel_grade: String,
    #[serde(default = "default_waste")]
    pub waste_percent: f64,
}

fn default_waste() -> f64 {
    5.0
}

impl InputRecord for ConcreteQuantityInput {
    fn check(&self, ctx: &EngineContext) -> Vec<FieldError> {
        let mut checks = FieldChecks::new();
        checks.non_empty("members", &self.members);
        for (i, m) in self.members.iter().enumerate() {
            checks
                .positive(format!("members[{}].length_m", i), m.length_m)
                .positive(format!("members[{}].width_m", i), m.width_m)
                .positive(format!("members[{}].depth_m", i), m.depth_m)
                .require(m.quantity > 0, format!("members[{}].quantity", i), "must be at least 1")
                .positive_opt(format!("members[{}].reinforcement_rate_kg_m3", i), m.reinforcement_rate_kg_m3);
        }
        checks.in_range("waste_percent", self.waste_percent, 0.0, 25.0);
        check_concrete_grade(&mut checks, ctx, "concrete_grade", &self.concrete_grade);
        check_steel_grade(&mut checks, ctx, "steel_grade", &self.steel_grade);
        checks.finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberQuantity {
    pub name: String,
    pub member_type: MemberType,
    pub quantity: u32,
    pub volume_m3: f64,
    pub reinforcement_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LowerCarbonOption {
    pub grade: String,
    pub embodied_carbon_kg: f64,
    pub carbon_saving_percent: f64,
    pub concrete_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcreteQuantityResult {
    pub members: Vec<MemberQuantity>,
    pub net_volume_m3: f64,
    pub order_volume_m3: f64,
    pub reinforcement_tonnes: f64,
    pub concrete_cost: f64,
    pub reinforcement_cost: f64,
    pub total_cost: f64,
    pub embodied_carbon_kg: f64,
    pub lower_carbon_options: Vec<LowerCarbonOption>,
}

pub fn take_off(ctx: &EngineContext, input: &ConcreteQuantityInput) -> EngineResult<ConcreteQuantityResult> {
    let db = &ctx.data.materials;
    let (ccat, csub) = CONCRETE_CATEGORY;
    let (scat, ssub) = REINFORCEMENT_CATEGORY;
    let concrete = db.get(ccat, csub, &input.concrete_grade)?;
    let steel = db.get(scat, ssub, &input.steel_grade)?;

    let members: Vec<MemberQuantity> = input
        .members
        .iter()
        .map(|m| {
            let volume = m.length_m * m.width_m * m.depth_m * f64::from(m.quantity);
            let rate = m
                .reinforcement_rate_kg_m3
                .unwrap_or_else(|| m.member_type.reinforcement_rate());
            MemberQuantity {
                name: m.name.clone(),
                member_type: m.member_type,
                quantity: m.quantity,
                volume_m3: volume,
                reinforcement_kg: volume * rate,
            }
        })
        .collect();

    let net_volume: f64 = members.iter().map(|m| m.volume_m3).sum();
    let order_volume = net_volume * (1.0 + input.waste_percent / 100.0);
    let tonnes: f64 = members.iter().map(|m| m.reinforcement_kg).sum::<f64>() / 1000.0;

    let concrete_cost = order_volume * concrete.cost_per_unit;
    let reinforcement_cost = tonnes * steel.cost_per_unit;
    let steel_carbon = tonnes * steel.embodied_carbon_per_unit;
    let carbon = order_volume * concrete.embodied_carbon_per_unit + steel_carbon;

    let fck = concrete.property("fck_mpa").unwrap_or(0.0);
    let lower_carbon_options = db
        .sustainable_alternatives(ccat, csub, &input.concrete_grade, "fck_mpa", fck)?
        .into_iter()
        .filter(|alt| alt.embodied_carbon_per_unit < concrete.embodied_carbon_per_unit)
        .map(|alt| {
            let alt_carbon = order_volume * alt.embodied_carbon_per_unit + steel_carbon;
            LowerCarbonOption {
                grade: alt.grade.clone(),
                embodied_carbon_kg: alt_carbon,
                carbon_saving_percent: if carbon > 0.0 { (carbon - alt_carbon) / carbon * 100.0 } else { 0.0 },
                concrete_cost: order_volume * alt.cost_per_unit,
            }
        })
        .collect();

    Ok(ConcreteQuantityResult {
        members,
        net_volume_m3: net_volume,
        order_volume_m3: order_volume,
        reinforcement_tonnes: tonnes,
        concrete_cost,
        reinforcement_cost,
        total_cost: concrete_cost + reinforcement_cost,
        embodied_carbon_kg: carbon,
        lower_carbon_options,
    })
}

pub(crate) fn calculate(ctx: &EngineContext, input: &ConcreteQuantityInput) -> EngineResult<Outcome> {
    let r = take_off(ctx, input)?;
    let best = r.lower_carbon_options.first().map(|o| {
        format!(
            "{} meets the strength requirement and saves {:.0}% embodied carbon",
            o.grade, o.carbon_saving_percent
        )
    });
    let mut outcome = Outcome::new(&r)?.standards(&["SBC 304:2018 - Concrete structures", "ISO 21930 - Environmental product declarations"]);
    if let Some(text) = best {
        outcome = outcome.recommend(text);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculations::test_support::context;

    fn input() -> ConcreteQuantityInput {
        serde_json::from_value(serde_json::json!({
            "concrete_grade": "C30",
            "waste_percent": 0,
            "members": [
                {"name": "B1", "member_type": "beam", "length_m": 5, "width_m": 0.3, "depth_m": 0.6, "quantity": 4},
                {"name": "S1", "member_type": "slab", "length_m": 10, "width_m": 10, "depth_m": 0.2}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_volumes_and_tonnage() {
        let ctx = context();
        let r = take_off(&ctx, &input()).unwrap();
        // 4 * 0.9 = 3.6 m³ beams, 20 m³ slab
        assert!((r.net_volume_m3 - 23.6).abs() < 1e-9);
        // 3.6*150 + 20*90 = 2340 kg
        assert!((r.reinforcement_tonnes - 2.34).abs() < 1e-9);
        assert!((r.concrete_cost - 23.6 * 260.0).abs() < 1e-6);
        assert!((r.total_cost - (23.6 * 260.0 + 2.34 * 3000.0)).abs() < 1e-6);
    }

    #[test]
    fn test_waste_allowance() {
        let ctx = context();
        let mut i = input();
        i.waste_percent = 10.0;
        let r = take_off(&ctx, &i).unwrap();
        assert!((r.order_volume_m3 - 25.96).abs() < 1e-9);
    }

    #[test]
    fn test_lower_carbon_alternative() {
        let ctx = context();
        let r = take_off(&ctx, &input()).unwrap();
        assert_eq!(r.lower_carbon_options[0].grade, "C30-GGBS");
        assert!(r.lower_carbon_options[0].carbon_saving_percent > 0.0);
    }

    #[test]
    fn test_member_errors_are_indexed() {
        let ctx = context();
        let mut i = input();
        i.members[1].depth_m = 0.0;
        let errors = i.check(&ctx);
        assert_eq!(errors[0].field, "members[1].depth_m");
    }
}
