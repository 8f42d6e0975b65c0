//! Fixed instructions sent to the extraction service.

use crate::models::label::{Label, PromoCode, SchemaVariant};

const COMPACT_INSTRUCTION: &str = r#"You will receive ONE product-promotion image. Return ONLY valid JSON with EXACTLY four keys:
{
  "name":        "<product name in Polish, exactly as on the image>",
  "price":       <number OR null>,
  "promo":       "<ONE of: NONE, SUP, DISC, DEALPCT, DEALFIX, BXYG, PACK>",
  "promo_args":  "<see rules below>"
}

promo / promo_args grammar (strict):
- NONE     -> promo_args=""
- SUP      -> promo_args="" OR N                  (integer >= 1)
- DISC     -> promo_args=P                        (P in 0..100, number only)
- DEALPCT  -> promo_args="N:P"                    (e.g. "3:27", "2:40")
- DEALFIX  -> promo_args="N=price"                (price with two decimals, e.g. "2=1.00")
- BXYG     -> promo_args="X:Y"                    (e.g. "1:1", "4:2")
- PACK     -> ONE of the following tokens (no spaces):
              - "N"      (price for ONE pack containing N units; e.g. "12")
              - "N:P"    (% off when buying ONE N-pack; e.g. "6:43")
              - "AxB"    (deal involving MULTIPLE packs; e.g. "2x6")
              - "AxB:P"  (% off on extra pack(s); e.g. "2x6:50")
              - OR a list of the tokens above joined by "|" (no spaces), e.g. "2x6|12".
              - The "|" separator is allowed ONLY for PACK.

Additional rules:
- Use ONLY the 7 allowed promo codes. Never invent new codes.
- If the ad shows NO numeric price, set "price": null (never guess).
- If both old and new prices are shown, set "price" to the discounted/new price.
- Ignore unit prices (zł/kg, zł/l), dates and loyalty-card notes; capture only the main promotion.
- PACK is used only when the price or discount explicitly refers to a pack (e.g. "12-pak", "2x6-pak").
  If the ad says "X+Y gratis" (even for packs), use BXYG instead.
- Include pack size in "name" ONLY if that exact text appears next to the product name.
- Use a dot for decimals (19.99). Do not include % or currency symbols in numeric fields.
- If multiple patterns match, resolve by priority: BXYG > PACK > DEALFIX > DEALPCT > DISC > SUP > NONE.
- Return JSON only, no markdown, no extra text."#;

const DECOMPOSED_INSTRUCTION: &str = r#"You will receive ONE product-promotion image. Return ONLY valid JSON with EXACTLY six keys:
{
  "name":  "<product name in Polish, exactly as on the image>",
  "price": <number OR null>,
  "promo": "<ONE of: NONE, SUP, DISC, DEALFIX, BXYG>",
  "core":  "<main promotion value, see below>",
  "cond":  "<quantity condition, see below>",
  "nth":   "<which item the promotion applies to, see below>"
}

core per promo (strict):
- NONE     -> core=""
- SUP      -> core=""
- DISC     -> core=P             (P in 0..100, number only)
- DEALFIX  -> core="D.DD"        (price with two decimals, e.g. "9.99")
- BXYG     -> core="X:Y"         (e.g. "1:1", "2:1")

cond: "" OR N (e.g. "2") OR AxB packs joined by "|" (e.g. "2x6", "2x6|3x4").
nth:  "" OR an integer >= 2 naming the discounted item (e.g. "2" for "second item -50%").

Consistency rules:
- NONE requires core="", cond="", nth="".
- SUP, BXYG and DEALFIX require nth="".
- DEALFIX requires a non-empty cond.
- DISC may set nth only when it equals cond (e.g. cond="2", nth="2").

Additional rules:
- Use ONLY the 5 allowed promo codes. Percent-off-when-buying-N deals are DISC with cond=N.
- If the ad shows NO numeric price, set "price": null (never guess).
- If both old and new prices are shown, set "price" to the discounted/new price.
- Ignore unit prices (zł/kg, zł/l), dates and loyalty-card notes; capture only the main promotion.
- Use a dot for decimals (19.99). Do not include % or currency symbols in any field. No spaces in core, cond or nth.
- If multiple patterns match, resolve by priority: BXYG > DEALFIX > DISC > SUP > NONE.
- Return JSON only, no markdown, no extra text."#;

/// System instruction for the schema.
pub fn system_instruction(schema: SchemaVariant) -> &'static str {
    match schema {
        SchemaVariant::Compact => COMPACT_INSTRUCTION,
        SchemaVariant::Decomposed => DECOMPOSED_INSTRUCTION,
    }
}

/// User instruction accompanying the image.
pub fn user_instruction(schema: SchemaVariant, forced_promo: Option<PromoCode>) -> String {
    let Some(promo) = forced_promo else {
        return "Extract promotion details from this image.".to_string();
    };

    let fields = match schema {
        SchemaVariant::Compact => "name, price and promo_args",
        SchemaVariant::Decomposed => "name, price and valid core/cond/nth",
    };
    format!(
        "Promo is fixed to {promo}. Set \"promo\": \"{promo}\" and infer only {fields} for this promo."
    )
}

/// Message asking for a corrected reply after a rejected one.
pub fn correction_instruction(reason: &str) -> String {
    format!(
        "Your previous JSON violated the schema ({}). Return corrected JSON only. Do not add explanations.",
        reason
    )
}

/// Instruction for re-checking an existing label against its image.
pub fn review_instruction(existing: &Label) -> String {
    format!(
        "This is the current label for the image:\n{}\n\
         Check it against the image. If it is correct, return it unchanged. \
         If anything is wrong, return the corrected label. If the image shows no promotion, set \"promo\": \"NONE\". \
         Return JSON only.",
        existing.to_pretty_json()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forced_instruction_pins_promo() {
        let text = user_instruction(SchemaVariant::Compact, Some(PromoCode::Disc));
        assert!(text.contains("\"promo\": \"DISC\""));
        assert!(text.contains("promo_args"));

        let text = user_instruction(SchemaVariant::Decomposed, Some(PromoCode::DealFix));
        assert!(text.contains("\"promo\": \"DEALFIX\""));
        assert!(text.contains("core/cond/nth"));

        assert!(!user_instruction(SchemaVariant::Compact, None).contains("fixed"));
    }

    #[test]
    fn test_system_instruction_lists_codes() {
        for code in SchemaVariant::Compact.allowed_codes() {
            assert!(system_instruction(SchemaVariant::Compact).contains(code.as_str()));
        }
        assert!(!system_instruction(SchemaVariant::Decomposed).contains("DEALPCT"));
    }

    #[test]
    fn test_correction_names_reason() {
        let text = correction_instruction("not an object");
        assert!(text.starts_with("Your previous JSON violated the schema (not an object)."));
    }
}
