//! 引擎配置

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::{BomError, Result};

/// 幣別精度上限
const MAX_CURRENCY_SCALE: u32 = 10;

/// 成本引擎配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 幣別小數位數（只在對外輸出時取整）
    pub currency_scale: u32,

    /// 取整規則
    pub rounding: RoundingMode,

    /// 新建 BOM 未指定利潤率時使用的預設值（百分比）
    pub default_profit_margin: Decimal,

    /// 批次報價時超過此筆數才平行計算
    pub parallel_quote_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency_scale: 2,
            rounding: RoundingMode::HalfUp,
            default_profit_margin: Decimal::ZERO,
            parallel_quote_threshold: 16,
        }
    }
}

impl EngineConfig {
    /// 創建預設配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 從 JSON 載入配置（未提供的欄位使用預設值）
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BomError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 建構器模式：設置幣別精度
    pub fn with_currency_scale(mut self, scale: u32) -> Self {
        self.currency_scale = scale;
        self
    }

    /// 建構器模式：設置取整規則
    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }

    /// 建構器模式：設置預設利潤率
    pub fn with_default_profit_margin(mut self, margin: Decimal) -> Self {
        self.default_profit_margin = margin;
        self
    }

    /// 建構器模式：設置平行報價門檻
    pub fn with_parallel_quote_threshold(mut self, threshold: usize) -> Self {
        self.parallel_quote_threshold = threshold;
        self
    }

    /// 檢查配置
    pub fn validate(&self) -> Result<()> {
        if self.currency_scale > MAX_CURRENCY_SCALE {
            return Err(BomError::Config(format!(
                "currency_scale {} 超過上限 {}",
                self.currency_scale, MAX_CURRENCY_SCALE
            )));
        }
        if self.default_profit_margin < Decimal::ZERO {
            return Err(BomError::Config(format!(
                "default_profit_margin 不可為負: {}",
                self.default_profit_margin
            )));
        }
        Ok(())
    }

    /// 依配置取整金額（固定小數位數，如 `42` → `42.00`）
    pub fn round_currency(&self, amount: Decimal) -> Decimal {
        let mut rounded =
            amount.round_dp_with_strategy(self.currency_scale, self.rounding.strategy());
        rounded.rescale(self.currency_scale);
        rounded
    }
}

/// 取整規則
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    /// 四捨五入（0.5 進位）
    HalfUp,

    /// 銀行家取整（0.5 取偶）
    HalfEven,

    /// 無條件捨去
    Down,
}

impl RoundingMode {
    fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
            RoundingMode::Down => RoundingStrategy::ToZero,
        }
    }
}
