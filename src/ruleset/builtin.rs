// src/ruleset/builtin.rs - Built-in China ruleset
//
// Consolidates the bespoke regex lists previously scattered across one-off
// detection scripts into one declarative table. Edit the tables, not the
// classifier.

use once_cell::sync::Lazy;

use crate::models::verdict::SignalTier;
use crate::ruleset::{
    CompiledRuleSet, ExclusionPattern, ExclusionRule, KnownEntity, RuleSet, Signal, SignalPattern,
};

const COUNTRY_CODE_WEIGHT: f64 = 1.0;
const STRONG_NAME_WEIGHT: f64 = 0.75;
const WEAK_NAME_WEIGHT: f64 = 0.4;
const ADDRESS_LOCALE_WEIGHT: f64 = 0.6;
const REGISTRY_WEIGHT: f64 = 0.95;

/// ISO and legacy codes recorded for mainland China, Hong Kong, and Macau.
const CHINA_COUNTRY_CODES: [&str; 7] = ["CN", "CHN", "PRC", "HK", "HKG", "MO", "MAC"];

/// Major-city tokens that, inside a company or institution name, are strong
/// evidence of Chinese affiliation.
const CHINA_CITIES: [&str; 16] = [
    "beijing", "shanghai", "shenzhen", "guangzhou", "hangzhou", "tianjin", "chengdu", "wuhan",
    "nanjing", "chongqing", "suzhou", "dongguan", "xiamen", "qingdao", "changsha", "shenyang",
];

/// Province tokens matched against address fields only: an address in
/// Guangdong is locale evidence, but "Hunan Garden Restaurant" in Ohio is not.
const CHINA_PROVINCES: [&str; 15] = [
    "guangdong", "zhejiang", "jiangsu", "sichuan", "shandong", "fujian", "hunan", "hubei", "anhui",
    "liaoning", "shaanxi", "hebei", "henan", "yunnan", "guangxi",
];

/// Known false positives: names that contain a China token but denote
/// non-Chinese entities or places.
const NAME_EXCLUSIONS: [(&str, &str); 9] = [
    ("excl:china-lake", "china lake"),
    ("excl:china-grove", "china grove"),
    ("excl:china-spring", "china spring"),
    ("excl:chinatown", "chinatown"),
    ("excl:chinaberry", "chinaberry"),
    ("excl:bone-china", "bone china"),
    ("excl:fine-china", "fine china"),
    ("excl:china-shop", "china shop"),
    ("excl:indochina", "indochina"),
];

/// Known-entity registry: canonical name plus the alias spellings seen in
/// patent assignee and exhibitor data.
const KNOWN_ENTITIES: [(&str, &[&str]); 16] = [
    ("Huawei Technologies", &["huawei", "huawei tech"]),
    ("ZTE Corporation", &["zte", "zhongxing telecommunication"]),
    ("Tencent Holdings", &["tencent"]),
    ("Alibaba Group", &["alibaba", "aliyun", "ant group"]),
    ("Baidu", &["baidu online network technology"]),
    ("Xiaomi", &["xiaomi communications"]),
    ("BYD Company", &["byd auto", "byd"]),
    ("Sinopec", &["china petroleum and chemical"]),
    ("PetroChina", &["china national petroleum"]),
    ("State Grid Corporation of China", &["state grid"]),
    ("Chinese Academy of Sciences", &["cas institute", "academia sinica beijing"]),
    ("Tsinghua University", &["tsinghua"]),
    ("Peking University", &["peking univ"]),
    ("SMIC", &["semiconductor manufacturing international"]),
    ("CATL", &["contemporary amperex technology"]),
    ("AVIC", &["aviation industry corporation of china"]),
];

/// Build the built-in ruleset. Callers needing different false-positive
/// tolerances load their own JSON ruleset instead.
pub fn builtin_china_ruleset() -> RuleSet {
    let mut signals = vec![Signal {
        id: "cc:china".to_string(),
        tier: SignalTier::CountryCode,
        weight: COUNTRY_CODE_WEIGHT,
        pattern: SignalPattern::CountryCodeIn(
            CHINA_COUNTRY_CODES.iter().map(|c| c.to_string()).collect(),
        ),
    }];

    signals.push(Signal {
        id: "strong:china-token".to_string(),
        tier: SignalTier::StrongName,
        weight: STRONG_NAME_WEIGHT,
        pattern: SignalPattern::NameContains("china".to_string()),
    });
    signals.push(Signal {
        id: "strong:chinese-token".to_string(),
        tier: SignalTier::StrongName,
        weight: STRONG_NAME_WEIGHT,
        pattern: SignalPattern::NameContains("chinese".to_string()),
    });
    for city in CHINA_CITIES {
        signals.push(Signal {
            id: format!("strong:city-{}", city),
            tier: SignalTier::StrongName,
            weight: STRONG_NAME_WEIGHT,
            pattern: SignalPattern::NameContains(city.to_string()),
        });
    }

    // Romanized fragments: real evidence, but shared with non-Chinese names,
    // hence the low weight and the lower tier.
    signals.push(Signal {
        id: "weak:sino-prefix".to_string(),
        tier: SignalTier::WeakName,
        weight: WEAK_NAME_WEIGHT,
        pattern: SignalPattern::NameRegex(r"\bsino\w*".to_string()),
    });
    signals.push(Signal {
        id: "weak:zhong-fragment".to_string(),
        tier: SignalTier::WeakName,
        weight: WEAK_NAME_WEIGHT,
        pattern: SignalPattern::NameRegex(r"\bzhong\w*".to_string()),
    });
    signals.push(Signal {
        id: "weak:pinyin-corporate".to_string(),
        tier: SignalTier::WeakName,
        weight: WEAK_NAME_WEIGHT,
        pattern: SignalPattern::NameRegex(r"\b(gongsi|youxian|jituan)\b".to_string()),
    });

    signals.push(Signal {
        id: "addr:country-china".to_string(),
        tier: SignalTier::AddressLocale,
        weight: ADDRESS_LOCALE_WEIGHT,
        pattern: SignalPattern::AddressRegex(r"\b(china|prc|p r china)\b".to_string()),
    });
    for province in CHINA_PROVINCES {
        signals.push(Signal {
            id: format!("addr:province-{}", province),
            tier: SignalTier::AddressLocale,
            weight: ADDRESS_LOCALE_WEIGHT,
            pattern: SignalPattern::AddressContains(province.to_string()),
        });
    }
    for city in CHINA_CITIES {
        signals.push(Signal {
            id: format!("addr:city-{}", city),
            tier: SignalTier::AddressLocale,
            weight: ADDRESS_LOCALE_WEIGHT,
            pattern: SignalPattern::AddressContains(city.to_string()),
        });
    }

    let exclusions = NAME_EXCLUSIONS
        .iter()
        .map(|(id, phrase)| ExclusionRule {
            id: id.to_string(),
            pattern: ExclusionPattern::NameContains(phrase.to_string()),
        })
        .collect();

    let registry = KNOWN_ENTITIES
        .iter()
        .map(|(canonical, aliases)| KnownEntity {
            canonical: canonical.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        })
        .collect();

    RuleSet {
        version: "builtin-china-v1".to_string(),
        registry_weight: REGISTRY_WEIGHT,
        signals,
        exclusions,
        registry,
    }
}

static COMPILED_BUILTIN: Lazy<CompiledRuleSet> = Lazy::new(|| {
    builtin_china_ruleset()
        .compile()
        .expect("built-in ruleset must validate and compile")
});

/// The compiled built-in ruleset, shared process-wide.
pub fn compiled_builtin() -> &'static CompiledRuleSet {
    &COMPILED_BUILTIN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_ruleset_validates_and_compiles() {
        let ruleset = builtin_china_ruleset();
        assert!(ruleset.validate().is_ok());
        let compiled = ruleset.compile().unwrap();
        assert!(!compiled.signals.is_empty());
        assert!(!compiled.exclusions.is_empty());
        assert!(!compiled.registry.is_empty());
    }

    #[test]
    fn test_builtin_fingerprint_stable() {
        assert_eq!(
            builtin_china_ruleset().fingerprint(),
            builtin_china_ruleset().fingerprint()
        );
        assert_eq!(compiled_builtin().fingerprint, builtin_china_ruleset().fingerprint());
    }

    #[test]
    fn test_builtin_covers_every_tier() {
        let compiled = compiled_builtin();
        for tier in crate::models::verdict::SignalTier::ordered() {
            let has_tier = compiled.signals_in_tier(tier).next().is_some()
                || tier == crate::models::verdict::SignalTier::KnownEntity;
            assert!(has_tier, "builtin ruleset missing tier {:?}", tier);
        }
    }
}
