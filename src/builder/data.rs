// src/builder/data.rs
// Static element properties used to build the material tables.
// The numeric literals are the canonical values; symbols and masses follow
// the IUPAC standard atomic weights, mean excitation energies the ICRU 37/49
// recommendations and binding energies the tabulated K absorption edges.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Properties of one chemical element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementProperties {
    pub symbol: &'static str,
    /// Standard atomic weight [g/mol]
    pub atomic_mass: f64,
    /// Mean excitation energy of the element in its reference state [MeV]
    pub mean_exc_energy: f64,
    /// K-shell binding energy [MeV]
    pub k_shell_binding_energy: f64,
}

impl ElementProperties {
    /// Energies are given in eV.
    const fn new(symbol: &'static str, atomic_mass: f64, mean_exc_ev: f64, k_shell_ev: f64) -> Self {
        ElementProperties {
            symbol,
            atomic_mass,
            mean_exc_energy: mean_exc_ev * 1.0e-6,
            k_shell_binding_energy: k_shell_ev * 1.0e-6,
        }
    }
}

/// Map from element symbol (e.g. `"Pb"`) to atomic number.
///
/// Derived from [`ELEMENTS`] so the two stay consistent.
pub static ELEMENT_Z: Lazy<HashMap<&'static str, usize>> = Lazy::new(|| {
    ELEMENTS
        .iter()
        .map(|(&z, props)| (props.symbol, z))
        .collect()
});

/// Element properties indexed by atomic number, Z = 1 to 100.
pub static ELEMENTS: Lazy<HashMap<usize, ElementProperties>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert(1, ElementProperties::new("H", 1.008, 19.2, 13.6));
    m.insert(2, ElementProperties::new("He", 4.0026, 41.8, 24.6));
    m.insert(3, ElementProperties::new("Li", 6.94, 40.0, 54.7));
    m.insert(4, ElementProperties::new("Be", 9.0122, 63.7, 111.5));
    m.insert(5, ElementProperties::new("B", 10.81, 76.0, 188.0));
    m.insert(6, ElementProperties::new("C", 12.011, 81.0, 284.2));
    m.insert(7, ElementProperties::new("N", 14.007, 82.0, 409.9));
    m.insert(8, ElementProperties::new("O", 15.999, 95.0, 543.1));
    m.insert(9, ElementProperties::new("F", 18.998, 115.0, 696.7));
    m.insert(10, ElementProperties::new("Ne", 20.180, 137.0, 870.2));

    m.insert(11, ElementProperties::new("Na", 22.990, 149.0, 1070.8));
    m.insert(12, ElementProperties::new("Mg", 24.305, 156.0, 1303.0));
    m.insert(13, ElementProperties::new("Al", 26.982, 166.0, 1559.6));
    m.insert(14, ElementProperties::new("Si", 28.085, 173.0, 1839.0));
    m.insert(15, ElementProperties::new("P", 30.974, 173.0, 2145.5));
    m.insert(16, ElementProperties::new("S", 32.06, 180.0, 2472.0));
    m.insert(17, ElementProperties::new("Cl", 35.45, 174.0, 2822.4));
    m.insert(18, ElementProperties::new("Ar", 39.948, 188.0, 3205.9));
    m.insert(19, ElementProperties::new("K", 39.098, 190.0, 3608.4));
    m.insert(20, ElementProperties::new("Ca", 40.078, 191.0, 4038.5));

    m.insert(21, ElementProperties::new("Sc", 44.956, 216.0, 4492.0));
    m.insert(22, ElementProperties::new("Ti", 47.867, 233.0, 4966.0));
    m.insert(23, ElementProperties::new("V", 50.942, 245.0, 5465.0));
    m.insert(24, ElementProperties::new("Cr", 51.996, 257.0, 5989.0));
    m.insert(25, ElementProperties::new("Mn", 54.938, 272.0, 6539.0));
    m.insert(26, ElementProperties::new("Fe", 55.845, 286.0, 7112.0));
    m.insert(27, ElementProperties::new("Co", 58.933, 297.0, 7709.0));
    m.insert(28, ElementProperties::new("Ni", 58.693, 311.0, 8333.0));
    m.insert(29, ElementProperties::new("Cu", 63.546, 322.0, 8979.0));
    m.insert(30, ElementProperties::new("Zn", 65.38, 330.0, 9659.0));

    m.insert(31, ElementProperties::new("Ga", 69.723, 334.0, 10367.0));
    m.insert(32, ElementProperties::new("Ge", 72.630, 350.0, 11103.0));
    m.insert(33, ElementProperties::new("As", 74.922, 347.0, 11867.0));
    m.insert(34, ElementProperties::new("Se", 78.971, 348.0, 12658.0));
    m.insert(35, ElementProperties::new("Br", 79.904, 357.0, 13474.0));
    m.insert(36, ElementProperties::new("Kr", 83.798, 352.0, 14326.0));
    m.insert(37, ElementProperties::new("Rb", 85.468, 363.0, 15200.0));
    m.insert(38, ElementProperties::new("Sr", 87.62, 366.0, 16105.0));
    m.insert(39, ElementProperties::new("Y", 88.906, 379.0, 17038.0));
    m.insert(40, ElementProperties::new("Zr", 91.224, 393.0, 17998.0));

    m.insert(41, ElementProperties::new("Nb", 92.906, 417.0, 18986.0));
    m.insert(42, ElementProperties::new("Mo", 95.95, 424.0, 20000.0));
    m.insert(43, ElementProperties::new("Tc", 98.0, 428.0, 21044.0));
    m.insert(44, ElementProperties::new("Ru", 101.07, 441.0, 22117.0));
    m.insert(45, ElementProperties::new("Rh", 102.91, 449.0, 23220.0));
    m.insert(46, ElementProperties::new("Pd", 106.42, 470.0, 24350.0));
    m.insert(47, ElementProperties::new("Ag", 107.87, 470.0, 25514.0));
    m.insert(48, ElementProperties::new("Cd", 112.41, 469.0, 26711.0));
    m.insert(49, ElementProperties::new("In", 114.82, 488.0, 27940.0));
    m.insert(50, ElementProperties::new("Sn", 118.71, 488.0, 29200.0));

    m.insert(51, ElementProperties::new("Sb", 121.76, 487.0, 30491.0));
    m.insert(52, ElementProperties::new("Te", 127.60, 485.0, 31814.0));
    m.insert(53, ElementProperties::new("I", 126.90, 491.0, 33169.0));
    m.insert(54, ElementProperties::new("Xe", 131.29, 482.0, 34561.0));
    m.insert(55, ElementProperties::new("Cs", 132.91, 488.0, 35985.0));
    m.insert(56, ElementProperties::new("Ba", 137.33, 491.0, 37441.0));
    m.insert(57, ElementProperties::new("La", 138.91, 501.0, 38925.0));
    m.insert(58, ElementProperties::new("Ce", 140.12, 523.0, 40443.0));
    m.insert(59, ElementProperties::new("Pr", 140.91, 535.0, 41991.0));
    m.insert(60, ElementProperties::new("Nd", 144.24, 546.0, 43569.0));

    m.insert(61, ElementProperties::new("Pm", 145.0, 560.0, 45184.0));
    m.insert(62, ElementProperties::new("Sm", 150.36, 574.0, 46834.0));
    m.insert(63, ElementProperties::new("Eu", 151.96, 580.0, 48519.0));
    m.insert(64, ElementProperties::new("Gd", 157.25, 591.0, 50239.0));
    m.insert(65, ElementProperties::new("Tb", 158.93, 614.0, 51996.0));
    m.insert(66, ElementProperties::new("Dy", 162.50, 628.0, 53789.0));
    m.insert(67, ElementProperties::new("Ho", 164.93, 650.0, 55618.0));
    m.insert(68, ElementProperties::new("Er", 167.26, 658.0, 57486.0));
    m.insert(69, ElementProperties::new("Tm", 168.93, 674.0, 59390.0));
    m.insert(70, ElementProperties::new("Yb", 173.05, 684.0, 61332.0));

    m.insert(71, ElementProperties::new("Lu", 174.97, 694.0, 63314.0));
    m.insert(72, ElementProperties::new("Hf", 178.49, 705.0, 65351.0));
    m.insert(73, ElementProperties::new("Ta", 180.95, 718.0, 67416.0));
    m.insert(74, ElementProperties::new("W", 183.84, 727.0, 69525.0));
    m.insert(75, ElementProperties::new("Re", 186.21, 736.0, 71676.0));
    m.insert(76, ElementProperties::new("Os", 190.23, 746.0, 73871.0));
    m.insert(77, ElementProperties::new("Ir", 192.22, 757.0, 76111.0));
    m.insert(78, ElementProperties::new("Pt", 195.08, 790.0, 78395.0));
    m.insert(79, ElementProperties::new("Au", 196.97, 790.0, 80725.0));
    m.insert(80, ElementProperties::new("Hg", 200.59, 800.0, 83102.0));

    m.insert(81, ElementProperties::new("Tl", 204.38, 810.0, 85530.0));
    m.insert(82, ElementProperties::new("Pb", 207.2, 823.0, 88005.0));
    m.insert(83, ElementProperties::new("Bi", 208.98, 823.0, 90526.0));
    m.insert(84, ElementProperties::new("Po", 209.0, 830.0, 93105.0));
    m.insert(85, ElementProperties::new("At", 210.0, 825.0, 95730.0));
    m.insert(86, ElementProperties::new("Rn", 222.0, 794.0, 98404.0));
    m.insert(87, ElementProperties::new("Fr", 223.0, 827.0, 101137.0));
    m.insert(88, ElementProperties::new("Ra", 226.0, 826.0, 103922.0));
    m.insert(89, ElementProperties::new("Ac", 227.0, 841.0, 106755.0));
    m.insert(90, ElementProperties::new("Th", 232.04, 847.0, 109651.0));

    m.insert(91, ElementProperties::new("Pa", 231.04, 878.0, 112601.0));
    m.insert(92, ElementProperties::new("U", 238.03, 890.0, 115606.0));
    m.insert(93, ElementProperties::new("Np", 237.0, 902.0, 118678.0));
    m.insert(94, ElementProperties::new("Pu", 244.0, 921.0, 121818.0));
    m.insert(95, ElementProperties::new("Am", 243.0, 934.0, 125027.0));
    m.insert(96, ElementProperties::new("Cm", 247.0, 939.0, 128220.0));
    m.insert(97, ElementProperties::new("Bk", 247.0, 952.0, 131590.0));
    m.insert(98, ElementProperties::new("Cf", 251.0, 966.0, 135960.0));
    m.insert(99, ElementProperties::new("Es", 252.0, 980.0, 139490.0));
    m.insert(100, ElementProperties::new("Fm", 257.0, 994.0, 143090.0));
    m
});
