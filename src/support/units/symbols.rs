//! Named unit symbols, each derived from a [`uom`] quantity.

use uom::si::{
    amount_of_substance::mole,
    angle::{degree, radian},
    electric_current::ampere,
    energy::joule,
    f64::{
        AmountOfSubstance, Angle, ElectricCurrent, Energy, Force, Length, LuminousIntensity, Mass,
        Power, Pressure, TemperatureInterval, Time, Volume,
    },
    force::{newton, pound_force},
    length::{foot, inch, meter, mile, nautical_mile},
    luminous_intensity::candela,
    mass::{gram, kilogram, pound},
    power::{horsepower, watt},
    pressure::pascal,
    temperature_interval::kelvin,
    time::{day, hour, minute, second},
    volume::liter,
};

use super::Unit;

/// SI prefixes accepted in front of metric symbols.
const PREFIXES: &[(&str, f64)] = &[
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("c", 1e-2),
    ("m", 1e-3),
    ("μ", 1e-6),
    ("u", 1e-6),
    ("n", 1e-9),
];

/// Symbols that may carry an SI prefix.
const METRIC: &[&str] = &["m", "g", "s", "N", "Pa", "W", "J", "L"];

/// Looks up a single unit symbol, with optional SI prefix.
pub(super) fn lookup(symbol: &str) -> Option<Unit> {
    if let Some(unit) = named(symbol) {
        return Some(unit);
    }
    PREFIXES.iter().find_map(|(prefix, factor)| {
        let base = symbol.strip_prefix(prefix)?;
        if !METRIC.contains(&base) {
            return None;
        }
        named(base).map(|unit| unit.scaled(*factor))
    })
}

fn named(symbol: &str) -> Option<Unit> {
    let unit = match symbol {
        "-" | "1" => Unit::DIMENSIONLESS,

        "m" => Unit::from_si(Length::new::<meter>(1.0)),
        "ft" => Unit::from_si(Length::new::<foot>(1.0)),
        "in" => Unit::from_si(Length::new::<inch>(1.0)),
        "mi" => Unit::from_si(Length::new::<mile>(1.0)),
        "nmi" => Unit::from_si(Length::new::<nautical_mile>(1.0)),

        "kg" => Unit::from_si(Mass::new::<kilogram>(1.0)),
        "g" => Unit::from_si(Mass::new::<gram>(1.0)),
        "lb" => Unit::from_si(Mass::new::<pound>(1.0)),

        "s" => Unit::from_si(Time::new::<second>(1.0)),
        "min" => Unit::from_si(Time::new::<minute>(1.0)),
        "hr" | "h" => Unit::from_si(Time::new::<hour>(1.0)),
        "day" | "days" => Unit::from_si(Time::new::<day>(1.0)),

        "A" => Unit::from_si(ElectricCurrent::new::<ampere>(1.0)),
        "K" => Unit::from_si(TemperatureInterval::new::<kelvin>(1.0)),
        "mol" => Unit::from_si(AmountOfSubstance::new::<mole>(1.0)),
        "cd" => Unit::from_si(LuminousIntensity::new::<candela>(1.0)),

        "N" => Unit::from_si(Force::new::<newton>(1.0)),
        "lbf" => Unit::from_si(Force::new::<pound_force>(1.0)),
        "Pa" => Unit::from_si(Pressure::new::<pascal>(1.0)),
        "psi" => lookup("lbf")? / lookup("in")?.powf(2.0),
        "J" => Unit::from_si(Energy::new::<joule>(1.0)),
        "W" => Unit::from_si(Power::new::<watt>(1.0)),
        "hp" => Unit::from_si(Power::new::<horsepower>(1.0)),
        "L" => Unit::from_si(Volume::new::<liter>(1.0)),

        "rad" => Unit::from_si(Angle::new::<radian>(1.0)),
        "deg" => Unit::from_si(Angle::new::<degree>(1.0)),

        "kts" | "knot" => lookup("nmi")? / lookup("hr")?,
        "mph" => lookup("mi")? / lookup("hr")?,

        _ => return None,
    };
    Some(unit)
}
