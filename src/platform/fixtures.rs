//! Synthetic player script used across tests

/// Minimal player script carrying both a signature cipher and a throttling transform
pub(crate) const PLAYER_JS: &str = r#"var _yt_player={};(function(g){var window=this;
var DE={AJ:function(a){a.reverse()},
VR:function(a,b){a.splice(0,b)},
kT:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c}};
Mka=function(a){a=a.split("");DE.kT(a,2);DE.AJ(a,54);DE.VR(a,1);DE.kT(a,31);return a.join("")};
g.Ys=function(a,b,c){c&&a.set(b,encodeURIComponent(Mka(c)))};
var Bpa=[iha];
iha=function(a){var b=a.split(""),c=[-1186681367,function(d,e){e=(e%d.length+d.length)%d.length;d.splice(e,1)},"ab,c",null,function(d){d.reverse()},b,function(d,e){d.push(e)},function(d,e){for(e=(e%d.length+d.length)%d.length;e--;)d.unshift(d.pop())},3,function(d,e){e=(e%d.length+d.length)%d.length;var f=d[0];d[0]=d[e];d[e]=f},-2,function(d,e){e=(e%d.length+d.length)%d.length;d.splice(0,1,d.splice(e,1,d[0])[0])},"x",function(d,e){e=(e%d.length+d.length)%d.length;d.splice(-e).reverse().forEach(function(f){d.unshift(f)})}];
c[3]=c;try{c[4](c[5]),c[7](c[5],c[8]),c[9](c[5],c[10]),c[6](c[5],c[12]),c[11](c[5],c[8]),c[13](c[5],c[10]),c[1](c[5],c[8]),c[9](c[3],c[8]),c[6](c[5],c[3])}catch(f){return"enhanced_except_"+a}return b.join("")};
g.Wq=function(a){a.D&&(b=a.get("n"))&&(b=Bpa[0](b),a.set("n",b),Bpa.length||iha(""))};
})(_yt_player);
"#;

/// Same script, but the throttling function is only reachable through `Bpa[0]`
pub(crate) const INDIRECT_PLAYER_JS: &str = r#"var _yt_player={};(function(g){var window=this;
var Bpa=[iha];
iha=function(a){var b=a.split(""),c=[-1186681367,function(d,e){e=(e%d.length+d.length)%d.length;d.splice(e,1)},"ab,c",null,function(d){d.reverse()},b,function(d,e){d.push(e)},function(d,e){for(e=(e%d.length+d.length)%d.length;e--;)d.unshift(d.pop())},3,function(d,e){e=(e%d.length+d.length)%d.length;var f=d[0];d[0]=d[e];d[e]=f},-2,function(d,e){e=(e%d.length+d.length)%d.length;d.splice(0,1,d.splice(e,1,d[0])[0])},"x",function(d,e){e=(e%d.length+d.length)%d.length;d.splice(-e).reverse().forEach(function(f){d.unshift(f)})}];
c[3]=c;try{c[4](c[5]),c[7](c[5],c[8]),c[9](c[5],c[10]),c[6](c[5],c[12]),c[11](c[5],c[8]),c[13](c[5],c[10]),c[1](c[5],c[8]),c[9](c[3],c[8]),c[6](c[5],c[3])}catch(f){return"enhanced_except_"+a}return b.join("")};
g.Wq=function(a){a.D&&(b=a.get("n"))&&(b=Bpa[0](b),a.set("n",b))};
})(_yt_player);
"#;
