//! UMD modules shared by the rendering tests.
//!
//! `create_umd_module` reproduces the two wrapper layouts bundlers emit so
//! every formatter test can run against both.

pub const FILE_PATH: &str = "/node_modules/test-package/some/file.js";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UmdStyle {
    /// Rollup-style ternary chain with an `exports` factory parameter.
    Conditional,
    /// webpack-style `if/else` chain.
    IfChain,
}

pub const BOTH_STYLES: [UmdStyle; 2] = [UmdStyle::Conditional, UmdStyle::IfChain];

#[derive(Debug, Clone, Copy)]
pub struct Dependency {
    pub specifier: &'static str,
    pub parameter: &'static str,
    pub global: &'static [&'static str],
}

pub const SOME_SIDE_EFFECT: Dependency = Dependency {
    specifier: "some-side-effect",
    parameter: "someSideEffect",
    global: &["someSideEffect"],
};

pub const LOCAL_DEP: Dependency = Dependency {
    specifier: "/local-dep",
    parameter: "localDep",
    global: &["localDep"],
};

pub const ANGULAR_CORE: Dependency = Dependency {
    specifier: "@angular/core",
    parameter: "core",
    global: &["ng", "core"],
};

pub const TSLIB: Dependency = Dependency {
    specifier: "/tslib",
    parameter: "tslib",
    global: &["tslib"],
};

pub const DEFAULT_DEPENDENCIES: &[Dependency] = &[SOME_SIDE_EFFECT, LOCAL_DEP, ANGULAR_CORE];

#[derive(Debug, Clone)]
pub struct UmdModuleOptions {
    pub module_name: &'static str,
    pub dependencies: Vec<Dependency>,
    /// Specifiers that are loaded but have no factory parameter.
    pub unused: Vec<&'static str>,
    /// Only the conditional layout has an `exports` parameter.
    pub exports_param: bool,
    pub global_initializer: bool,
    pub preamble: &'static str,
}

impl Default for UmdModuleOptions {
    fn default() -> Self {
        UmdModuleOptions {
            module_name: "file",
            dependencies: DEFAULT_DEPENDENCIES.to_vec(),
            unused: Vec::new(),
            exports_param: true,
            global_initializer: false,
            preamble: "/* A copyright notice */",
        }
    }
}

pub fn create_umd_module(style: UmdStyle, options: &UmdModuleOptions, factory_body: &str) -> String {
    let module = match style {
        UmdStyle::Conditional => conditional_module(options, factory_body),
        UmdStyle::IfChain => if_chain_module(options, factory_body),
    };
    format!("{}\n{}", options.preamble, module)
}

fn factory_parameters(options: &UmdModuleOptions) -> Vec<String> {
    options
        .dependencies
        .iter()
        .filter(|dep| !options.unused.contains(&dep.specifier))
        .map(|dep| dep.parameter.to_string())
        .collect()
}

fn conditional_module(options: &UmdModuleOptions, factory_body: &str) -> String {
    let name = options.module_name;
    let mut requires = Vec::new();
    let mut amd = Vec::new();
    let mut globals = Vec::new();
    let mut params = Vec::new();
    if options.exports_param {
        requires.push("exports".to_string());
        amd.push("'exports'".to_string());
        globals.push(format!("global.{}", name));
        params.push("exports".to_string());
    }
    for dep in &options.dependencies {
        requires.push(format!("require('{}')", dep.specifier));
        amd.push(format!("'{}'", dep.specifier));
        globals.push(format!("global.{}", dep.global.join(".")));
    }
    params.extend(factory_parameters(options));

    let define_dependencies = if amd.is_empty() {
        String::new()
    } else {
        format!("[{}], ", amd.join(", "))
    };
    let initializer = if options.global_initializer {
        "global = global || self, "
    } else {
        ""
    };

    format!(
        "(function (global, factory) {{\n\
         \x20 typeof exports === 'object' && typeof module !== 'undefined' ?\n\
         \x20   factory({requires}) :\n\
         \x20 typeof define === 'function' && define.amd ?\n\
         \x20   define('{name}', {define_dependencies}factory) :\n\
         \x20 ({initializer}factory({globals}));\n\
         }}(this, (function ({params}) {{\n\
         \x20 'use strict';\n\
         {factory_body}\n\
         }})));\n",
        requires = requires.join(", "),
        name = name,
        define_dependencies = define_dependencies,
        initializer = initializer,
        globals = globals.join(", "),
        params = params.join(", "),
        factory_body = factory_body,
    )
}

fn if_chain_module(options: &UmdModuleOptions, factory_body: &str) -> String {
    let name = options.module_name;
    let requires: Vec<String> = options
        .dependencies
        .iter()
        .map(|dep| format!("require('{}')", dep.specifier))
        .collect();
    let amd: Vec<String> = options
        .dependencies
        .iter()
        .map(|dep| format!("'{}'", dep.specifier))
        .collect();
    let roots: Vec<String> = options
        .dependencies
        .iter()
        .map(|dep| {
            let path: String = dep.global.iter().map(|seg| format!("['{}']", seg)).collect();
            format!("root{}", path)
        })
        .collect();

    format!(
        "(function webpackUniversalModuleDefinition(root, factory) {{\n\
         \x20 if (typeof exports === 'object' && typeof module === 'object')\n\
         \x20   module.exports = factory({requires});\n\
         \x20 else if (typeof define === 'function' && define.amd)\n\
         \x20   define([{amd}], factory);\n\
         \x20 else if (typeof exports === 'object')\n\
         \x20   exports['{name}'] = factory({requires});\n\
         \x20 else\n\
         \x20   root['{name}'] = factory({roots});\n\
         }})(this, function ({params}) {{\n\
         \x20 'use strict';\n\
         {factory_body}\n\
         }});\n",
        requires = requires.join(", "),
        amd = amd.join(", "),
        name = name,
        roots = roots.join(", "),
        params = factory_parameters(options).join(", "),
        factory_body = factory_body,
    )
}

pub const PROGRAM_BODY: &str = "
var A = (function() {
  function A() {}
  A.decorators = [
    { type: core.Directive, args: [{ selector: '[a]' }] },
    { type: OtherA }
  ];
  A.prototype.ngDoCheck = function() {
    //
  };
  return A;
}());

var B = (function() {
  function B() {}
  B.decorators = [
    { type: OtherB },
    { type: core.Directive, args: [{ selector: '[b]' }] }
  ];
  return B;
}());

var C = (function() {
  function C() {}
  C.decorators = [
    { type: core.Directive, args: [{ selector: '[c]' }] },
  ];
  return C;
}());

function NoIife() {}

var BadIife = (function() {
  function BadIife() {}
  BadIife.decorators = [
    { type: core.Directive, args: [{ selector: '[c]' }] },
  ];
}());

// Some other content
exports.A = A;
exports.B = B;
exports.C = C;
exports.NoIife = NoIife;
exports.BadIife = BadIife;
";

pub const DECORATE_PROGRAM_BODY: &str = "
  var OtherA = function () { return function (node) { }; };
  var OtherB = function () { return function (node) { }; };
  var A = /** @class */ (function () {
      function A() {
      }
      A = tslib.__decorate([
          core.Directive({ selector: '[a]' }),
          OtherA()
      ], A);
      return A;
  }());
  exports.A = A;
  var B = /** @class */ (function () {
      function B() {
      }
      B = tslib.__decorate([
          OtherB(),
          core.Directive({ selector: '[b]' })
      ], B);
      return B;
  }());
  exports.B = B;
  var C = /** @class */ (function () {
      function C() {
      }
      C = tslib.__decorate([
          core.Directive({ selector: '[c]' })
      ], C);
      return C;
  }());
  exports.C = C;
  var D = /** @class */ (function () {
      function D() {
      }
      D_1 = D;
      var D_1;
      D = D_1 = tslib.__decorate([
          core.Directive({ selector: '[d]', providers: [D_1] })
      ], D);
      return D;
  }());
  exports.D = D;
  var E = /** @class */ (function () {
      function E() {
      }
      return E = tslib_1.__decorate([
          core.Directive({ selector: '[e]' })
      ], E);
  }());
  exports.E = E;
  // Some other content
";

pub const SOME_DIRECTIVE_BODY: &str = "
  var SomeDirective = /** @class **/ (function () {
    function SomeDirective(zone, cons) {}
    SomeDirective.prototype.method = function() {}
    SomeDirective.decorators = [
      { type: core.Directive, args: [{ selector: '[a]' }] },
      { type: OtherA }
    ];
    SomeDirective.ctorParameters = function() { return [
      { type: core.NgZone },
      { type: core.Console }
    ]; };
    return SomeDirective;
  }());
  exports.SomeDirective = SomeDirective;
";

pub fn some_directive_options() -> UmdModuleOptions {
    UmdModuleOptions {
        dependencies: vec![TSLIB, ANGULAR_CORE],
        ..UmdModuleOptions::default()
    }
}
